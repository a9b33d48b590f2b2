use datafusion::arrow::error::ArrowError;
use datafusion::common::DataFusionError;
use thiserror::Error;
use trawl_common::error::CommonError;
use trawl_execution::error::ExecutionError;

pub type SqlReadResult<T> = Result<T, SqlReadError>;

#[derive(Debug, Error)]
pub enum SqlReadError {
    #[error("error in DataFusion: {0}")]
    DataFusionError(#[from] DataFusionError),
    #[error("error in Arrow: {0}")]
    ArrowError(#[from] ArrowError),
    #[error("error in task execution: {0}")]
    ExecutionError(#[from] ExecutionError),
    #[error("{0}")]
    CommonError(#[from] CommonError),
    #[error("probe query failed: {0}")]
    ProbeQueryError(Box<SqlReadError>),
    #[error("fetch failed for partition {partition}: {source}")]
    PartitionFetchError {
        partition: usize,
        source: Box<SqlReadError>,
    },
    #[error("error in SQL engine: {0}")]
    EngineError(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl SqlReadError {
    pub fn engine(message: impl Into<String>) -> Self {
        SqlReadError::EngineError(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SqlReadError::InternalError(message.into())
    }
}
