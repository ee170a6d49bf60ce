//! Exit code logic for the optical process.
//!
//! Single responsibility: map query outcomes to the process exit code.

use optical_core::PipelineError;

use crate::ProcessExit;

/// Determines the exit outcome of a query that completed.
pub(crate) fn determine_exit_outcome(record_count: usize) -> ProcessExit {
    if record_count == 0 {
        ProcessExit::NotFound
    } else {
        ProcessExit::Success
    }
}

/// Determines the exit outcome of a query that failed.
pub(crate) fn exit_for_error(error: &PipelineError) -> ProcessExit {
    if error.is_usage_error() {
        ProcessExit::Invalid
    } else {
        ProcessExit::Failure
    }
}
