//! CLI error types.

use strato_proto::ProtoError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Wrong number of positional arguments.
    #[error("wrong number of arguments: expected {expected}, got {actual}")]
    ArgumentCount {
        /// Arity the command requires.
        expected: usize,
        /// Arity that was given.
        actual: usize,
    },

    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The server could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server error {status} ({code}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Server error code.
        code: String,
        /// Server error message.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The task ended in the ERROR state.
    #[error("task {task_id} ({operation}) failed: {message}")]
    TaskFailed {
        /// Task id.
        task_id: String,
        /// Task operation.
        operation: String,
        /// Joined step error messages.
        message: String,
    },

    /// The task did not reach a terminal state in time.
    #[error("timed out waiting for task {task_id}, last state {last_state}")]
    TaskTimeout {
        /// Task id.
        task_id: String,
        /// Last observed state.
        last_state: String,
    },

    /// The server reported a task state this client does not know.
    #[error("task {task_id} is in unknown state '{state}'")]
    UnknownTaskState {
        /// Task id.
        task_id: String,
        /// The unrecognized state string.
        state: String,
    },

    /// The operation was interrupted.
    #[error("cancelled")]
    Cancelled,

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtoError> for CliError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Decoding(msg) => Self::Protocol(msg),
            ProtoError::Validation(msg) => Self::Validation(msg),
        }
    }
}
