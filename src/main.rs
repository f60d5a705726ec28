//! Binary entrypoint for the `maniphest-link` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match maniphest_link::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
