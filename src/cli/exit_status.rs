use std::process::ExitCode;

use super::commands::CommandResult;

/// Process exit status of the `translens` binary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// 0: nothing that fails the run was found.
    Success,
    /// 1: error-level issues, or `init` refused to overwrite.
    Failure,
    /// 2: the command itself could not run (bad config, I/O).
    Error,
}

impl ExitStatus {
    /// Warnings never fail a run; errors only do when the command asks for it.
    pub(crate) fn from_result(result: &CommandResult) -> Self {
        if result.exit_on_errors && result.error_count > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(match status {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Error => 2,
        })
    }
}
