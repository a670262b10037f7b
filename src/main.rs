//! keel CLI entry point
//!
//! Parses the command line, runs the selected command, and turns any fault
//! into a user-friendly error with suggestions before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use keel::cli;
use keel::core::error::{is_cancellation, user_friendly_error};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // 130 mirrors the shell's interrupt status so scripts can tell
            // a Ctrl-C apart from a fault.
            let code = if is_cancellation(&e) { 130 } else { 1 };
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(code);
        }
    }
}
