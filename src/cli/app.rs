//! Argument parsing and top-level dispatch

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::error::BuildError;
use crate::output::{ConsoleOutput, Output};
use crate::runtime::{BuildRunner, RuntimeConfiguration};

#[derive(Debug, Parser)]
#[command(name = "sb", about = "Savant build tool")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Build file to run
    #[arg(long, env = "SAVANT_BUILD_FILE", default_value = "build.toml")]
    pub file: PathBuf,

    /// Switches (`--listTargets`, `--name=value`, ...) and targets to run
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Main entry point for the CLI
pub fn run() -> Result<(), BuildError> {
    let cli = Cli::parse();
    let runtime = Rc::new(RuntimeConfiguration::from_args(&cli.args));
    init_tracing(runtime.debug);

    let output: Rc<dyn Output> = Rc::new(ConsoleOutput::new(runtime.colorize, runtime.debug));
    if runtime.print_version {
        output.info(&format!("Savant version [{}]", env!("CARGO_PKG_VERSION")));
        return Ok(());
    }

    output.debug(&format!("Running build file [{}]", cli.file.display()));
    BuildRunner::new(Rc::clone(&output)).run(&cli.file, runtime)
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_and_targets_are_passed_through() {
        let cli = Cli::try_parse_from(["sb", "--listTargets", "compile", "--env=ci"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("build.toml"));
        assert_eq!(cli.args, vec!["--listTargets", "compile", "--env=ci"]);
    }

    #[test]
    fn file_before_targets() {
        let cli = Cli::try_parse_from(["sb", "--file", "other.toml", "--help"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("other.toml"));
        assert_eq!(cli.args, vec!["--help"]);
    }
}
