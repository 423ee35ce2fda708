//! pkgsync - reconcile installed packages against want lists

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = pkgsync_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
