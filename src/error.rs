use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// A column the pipeline's contract depends on is missing outright.
    /// Aborts the run; there is no partial recovery mid-pipeline.
    #[error("required column '{column}' is missing from {frame}")]
    MissingColumn { column: String, frame: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
