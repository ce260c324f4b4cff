//! Output sink for build progress
//!
//! The engine reports what it is doing through [`Output`]; formatting and
//! colour belong to the sink. Structured diagnostics go through `tracing`
//! instead.

use std::cell::RefCell;

use colored::Colorize;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
    Debug,
}

pub trait Output {
    fn info(&self, message: &str);

    fn error(&self, message: &str);

    /// Only shown when debug output is enabled
    fn debug(&self, message: &str);

    fn is_debug(&self) -> bool;
}

/// Writes to stdout/stderr
#[derive(Debug, Clone, Default)]
pub struct ConsoleOutput {
    colorize: bool,
    debug: bool,
}

impl ConsoleOutput {
    pub fn new(colorize: bool, debug: bool) -> Self {
        Self { colorize, debug }
    }
}

impl Output for ConsoleOutput {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        if self.colorize {
            eprintln!("{}", message.red());
        } else {
            eprintln!("{}", message);
        }
    }

    fn debug(&self, message: &str) {
        if !self.debug {
            return;
        }

        if self.colorize {
            println!("{}", message.dimmed());
        } else {
            println!("{}", message);
        }
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}

/// Records every message. Used by tests and for capturing plugin output.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    messages: RefCell<Vec<(Level, String)>>,
    debug: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    /// Messages of one level, in order
    pub fn lines(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn record(&self, level: Level, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

impl Output for MemoryOutput {
    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        if self.debug {
            self.record(Level::Debug, message);
        }
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_output_keeps_order() {
        let output = MemoryOutput::new();
        output.info("one");
        output.error("two");
        output.info("three");

        assert_eq!(output.lines(Level::Info), vec!["one", "three"]);
        assert_eq!(output.lines(Level::Error), vec!["two"]);
    }

    #[test]
    fn debug_is_silent_unless_enabled() {
        let quiet = MemoryOutput::new();
        quiet.debug("hidden");
        assert!(quiet.messages().is_empty());

        let loud = MemoryOutput::with_debug();
        loud.debug("shown");
        assert_eq!(loud.lines(Level::Debug), vec!["shown"]);
    }
}
