//! Savant build tool

use std::process::ExitCode;

fn main() -> ExitCode {
    match savant::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            ExitCode::from(code)
        }
    }
}
