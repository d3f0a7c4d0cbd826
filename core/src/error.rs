use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Table {0} contains no usable rows")]
    EmptyTable(&'static str),
    #[error("Invalid resample interval: {0}")]
    InvalidInterval(String),
    #[error("Timestamp {0} can't be aligned to the resample grid")]
    Alignment(chrono::DateTime<chrono::Utc>),
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Need at least {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },
    #[error("Expected {expected} features, got {actual}")]
    Shape { expected: usize, actual: usize },
    #[error("Feature matrix has {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("Model was not fitted")]
    NotFitted,
}
