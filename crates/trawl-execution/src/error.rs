use thiserror::Error;

pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("task aborted: {0}")]
    TaskAborted(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExecutionError {
    pub fn internal(message: impl Into<String>) -> Self {
        ExecutionError::InternalError(message.into())
    }
}
