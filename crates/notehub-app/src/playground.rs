use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json,
};
use notehub_dal::{
    saved_code::{CreateSavedCode, SavedCodeRepository},
    user::User,
};
use notehub_types::lang::execution_language_id;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    session::{CurrentUser, MaybeUser},
    state::AppState,
};

repository_from_request!(SavedCodeRepository);

#[derive(Debug, Deserialize)]
pub struct RunBody {
    language: Option<String>,
    code: Option<String>,
    #[serde(default)]
    stdin: Option<String>,
}

pub async fn run_code(
    State(state): State<AppState>,
    Json(body): Json<RunBody>,
) -> ApiResult<impl IntoResponse> {
    let (Some(language), Some(code)) = (body.language, body.code) else {
        return Err(ApiError::InvalidRequest(
            "Language and code are required".to_string(),
        ));
    };
    let language_id = execution_language_id(&language)
        .ok_or_else(|| ApiError::InvalidRequest("Unsupported language".to_string()))?;

    let stdin = body.stdin.unwrap_or_default();
    match state.exec().run(language_id, &code, &stdin).await {
        Ok(outcome) => Ok(Json(outcome).into_response()),
        Err(e) => {
            error!("Code execution failed: {e}");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Server error while running code"})),
            )
                .into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskBody {
    #[serde(default)]
    message: Option<String>,
}

/// AI chat never fails with an error status, every outcome is a reply.
pub async fn ask_ai(
    State(state): State<AppState>,
    Json(body): Json<AskBody>,
) -> Json<serde_json::Value> {
    let Some(message) = body.message.filter(|m| !m.trim().is_empty()) else {
        return Json(json!({"reply": "Please type a message."}));
    };

    let reply = match state.genai().ask(&message).await {
        Ok(Some(text)) => text,
        Ok(None) => "No response from AI.".to_string(),
        Err(e) => {
            warn!("AI request failed: {e}");
            "AI Error. Try again later.".to_string()
        }
    };
    Json(json!({"reply": reply}))
}

#[derive(Debug, Deserialize)]
pub struct SaveCodeBody {
    title: String,
    language: String,
    code: String,
}

pub async fn save_code(
    MaybeUser(user): MaybeUser,
    repository: SavedCodeRepository,
    Json(body): Json<SaveCodeBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let Some(user) = user else {
        return Ok(Json(json!({"success": false, "message": "Login required"})));
    };
    repository
        .create(CreateSavedCode {
            user_id: user.id,
            title: body.title,
            language: body.language,
            code: body.code,
        })
        .await?;
    Ok(Json(json!({"success": true})))
}

#[derive(Serialize)]
struct MyCodesPage {
    codes: Vec<notehub_dal::saved_code::SavedCode>,
    user: User,
}

pub async fn my_codes(
    CurrentUser(user): CurrentUser,
    repository: SavedCodeRepository,
) -> ApiResult<impl IntoResponse> {
    let codes = repository.list_for_user(user.id).await?;
    Ok(Json(MyCodesPage { codes, user }))
}

pub async fn get_code(
    CurrentUser(user): CurrentUser,
    repository: SavedCodeRepository,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let code = repository.get(id).await?;
    // saved codes are private to their owner
    if code.user_id != user.id {
        return Err(ApiError::ResourceNotFound("Saved code".to_string()));
    }
    Ok(Json(code))
}

pub async fn delete_code(
    CurrentUser(user): CurrentUser,
    repository: SavedCodeRepository,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    repository.delete_owned(id, user.id).await?;
    Ok(Redirect::to("/my-codes"))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/run-code", post(run_code))
        .route("/ask-ai", post(ask_ai))
        .route("/save-code", post(save_code))
        .route("/my-codes", get(my_codes))
        .route("/code/{id}", get(get_code))
        .route("/delete-code/{id}", post(delete_code))
}
