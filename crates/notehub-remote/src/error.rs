pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Remote service is not configured")]
    NotConfigured,
}
