use elevator_core::error::{FeatureError, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Failed preparing database directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    DB(#[from] DBError),
    #[error("Invalid feature reference: {0}")]
    FeatureRef(String),
    #[error("Unknown feature view: {0}")]
    UnknownView(String),
    #[error("Unknown feature {1} in view {0}")]
    UnknownFeature(String, String),
    #[error("Snapshot column {0} is missing or has the wrong type")]
    Column(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::DB(DBError::SQLError(err))
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    DB(#[from] DBError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Failed accessing model: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid model file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No timestamp at second {0} of the job minute")]
    Timestamp(u32),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Internal(#[from] DBError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DB(#[from] DBError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("Server failed: {0}")]
    Server(#[from] warp::Error),
    #[error("Failed initializing logging: {0}")]
    Logging(String),
}
