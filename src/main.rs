//! CLI entry point for optical.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ProcessExit {
    /// At least one record matched.
    Success = 0,
    /// Transport, response or config failure.
    Failure = 1,
    /// Bad filter, missing or bad host.
    Invalid = 2,
    /// The query matched no records.
    NotFound = 4,
    /// Ctrl-C before the query finished.
    Interrupted = 130,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit as u8)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_optical().await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}
