use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use garde::Validate as _;
use notehub_dal::snippet::{CreateSnippet, SnippetRepository};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{error::ApiResult, repository_from_request, session::MaybeUser, state::AppState};

repository_from_request!(SnippetRepository);

#[derive(Debug, Deserialize)]
pub struct SaveSnippetBody {
    name: String,
    language: String,
    code: String,
}

/// Anyone can share a snippet, logged in or not. Failures are reported
/// in the body so the share dialog can stay on the page.
pub async fn save(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    repository: SnippetRepository,
    Json(body): Json<SaveSnippetBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let payload = CreateSnippet {
        user_id: user.map(|u| u.id.to_string()),
        name: body.name,
        language: body.language,
        code: body.code,
    };
    if let Err(e) = payload.validate() {
        debug!("Invalid snippet: {e}");
        return Ok(Json(json!({"success": false})));
    }

    match repository.create(payload).await {
        Ok(snippet) => {
            let link = state.build_url(&format!("snippet/{}", snippet.id))?;
            Ok(Json(json!({"success": true, "link": link.as_str()})))
        }
        Err(e) => {
            debug!("Snippet save failed: {e}");
            Ok(Json(json!({"success": false})))
        }
    }
}

pub async fn view(
    repository: SnippetRepository,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let snippet = repository.get(&id).await?;
    Ok(Json(snippet))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/snippet/save", post(save))
        .route("/snippet/{id}", get(view))
}
