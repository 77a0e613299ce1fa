use axum::response::{Html, IntoResponse, Response};

use crate::{error::ApiError, state::AppState};

/// Serves a static page from the configured public directory.
pub async fn serve(state: &AppState, file: &str) -> Result<Response, ApiError> {
    let path = state.get_app_config().public_dir.join(file);
    let content = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::ResourceNotFound("Page".to_string())
        } else {
            ApiError::InternalError(e.into())
        }
    })?;
    Ok(Html(content).into_response())
}
