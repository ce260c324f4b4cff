//! Command-line runtime configuration

use std::collections::{BTreeMap, BTreeSet};

/// Free-form `--name` and `--name=value` arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switches {
    flags: BTreeSet<String>,
    values: BTreeMap<String, Vec<String>>,
}

impl Switches {
    pub fn add(&mut self, name: impl Into<String>) {
        self.flags.insert(name.into());
    }

    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    /// True when the switch was given with or without a value
    pub fn has(&self, name: &str) -> bool {
        self.flags.contains(name) || self.values.contains_key(name)
    }

    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.values
            .get(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    /// Values in the order given, `None` when the switch never had one
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfiguration {
    pub colorize: bool,
    pub debug: bool,
    pub help: bool,
    pub list_targets: bool,
    pub print_version: bool,
    pub switches: Switches,

    /// Targets to run, in the order given
    pub targets: Vec<String>,
}

impl Default for RuntimeConfiguration {
    fn default() -> Self {
        Self {
            colorize: true,
            debug: false,
            help: false,
            list_targets: false,
            print_version: false,
            switches: Switches::default(),
            targets: Vec::new(),
        }
    }
}

impl RuntimeConfiguration {
    /// Splits arguments into fixed switches, free switches and targets.
    /// Order does not matter.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut configuration = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--noColor" => configuration.colorize = false,
                "--debug" => configuration.debug = true,
                "--help" => configuration.help = true,
                "--listTargets" => configuration.list_targets = true,
                "--version" => configuration.print_version = true,
                _ => match arg.strip_prefix("--") {
                    Some(switch) => match switch.split_once('=') {
                        Some((name, value)) => configuration.switches.add_value(name, value),
                        None => configuration.switches.add(switch),
                    },
                    None => configuration.targets.push(arg.to_string()),
                },
            }
        }

        configuration
    }
}
