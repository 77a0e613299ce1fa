use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing::error;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    ResourceNotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    ValidationError(#[from] garde::Report),
    #[error("Multipart error: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Remote service error: {0}")]
    RemoteServiceError(#[from] notehub_remote::RemoteError),
    #[error("Database error: {0}")]
    DatabaseError(notehub_dal::Error),
    #[error("Store error: {0}")]
    StoreError(notehub_store::StoreError),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<notehub_dal::Error> for ApiError {
    fn from(e: notehub_dal::Error) -> Self {
        use notehub_dal::Error;
        match e {
            Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            Error::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".to_string()),
            Error::EmailTaken => ApiError::Conflict(
                "This email is already registered. Please login instead.".to_string(),
            ),
            other => ApiError::DatabaseError(other),
        }
    }
}

impl From<notehub_store::StoreError> for ApiError {
    fn from(e: notehub_store::StoreError) -> Self {
        use notehub_store::StoreError;
        match e {
            StoreError::NotFound(name) => ApiError::ResourceNotFound(format!("File {name}")),
            StoreError::InvalidName => ApiError::InvalidRequest("Invalid file name".to_string()),
            other => ApiError::StoreError(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MultipartError(_) => StatusCode::BAD_REQUEST,
            ApiError::RemoteServiceError(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatabaseError(_) | ApiError::StoreError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("Server error: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dal_error_mapping() {
        let resp = ApiError::from(notehub_dal::Error::RecordNotFound("Note".to_string()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(notehub_dal::Error::InvalidCredentials).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = ApiError::from(notehub_dal::Error::EmailTaken).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_error_mapping() {
        let resp =
            ApiError::from(notehub_store::StoreError::NotFound("x.pdf".to_string()))
                .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(notehub_store::StoreError::InvalidName).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
