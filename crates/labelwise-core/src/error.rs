use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelwiseError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid risk database: {0}")]
    InvalidDatabase(String),
}
