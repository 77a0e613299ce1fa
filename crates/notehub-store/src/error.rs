pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Invalid file name")]
    InvalidName,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Upload stream error: {0}")]
    StreamError(String),
}
