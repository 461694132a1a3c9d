//! Error types for host calls.

use ftbar_core::error::FtbarError;

use crate::types::HostCommand;

/// Errors from dispatching a command to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("Unknown host command: {0}")]
    UnknownCommand(String),
    #[error("Host call {command} failed: {message}")]
    HostCallFailed { command: HostCommand, message: String },
    #[error("Invalid response from {command}: {message}")]
    InvalidResponse { command: HostCommand, message: String },
    #[error("Host command not supported: {0}")]
    Unsupported(HostCommand),
}

impl From<ActionError> for FtbarError {
    fn from(err: ActionError) -> Self {
        FtbarError::Action(err.to_string())
    }
}
