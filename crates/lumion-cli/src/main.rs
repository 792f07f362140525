//! Lumion CLI entry point.

use std::process::ExitCode;

mod cli;
pub mod ui;

fn main() -> ExitCode {
    cli::run()
}
