use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Json,
};
use notehub_dal::{
    admin::{Admin, AdminRepository},
    note::{ModerationCounts, Note, NoteRepository},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::{
    error::{ApiError, ApiResult},
    pages, repository_from_request,
    session::{login_admin, logout_admin, CurrentAdmin},
    state::AppState,
};

repository_from_request!(AdminRepository);

const REPORT_SIZE: i64 = 5;

async fn login_page(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    pages::serve(&state, "admin-login.html").await
}

#[derive(Debug, Deserialize)]
struct AdminCredentials {
    username: String,
    password: String,
}

async fn login(
    admin_registry: AdminRepository,
    session: Session,
    Form(credentials): Form<AdminCredentials>,
) -> ApiResult<impl IntoResponse> {
    let admin = admin_registry
        .check_password(&credentials.username, &credentials.password)
        .await
        .map_err(|e| {
            debug!("Admin check error: {e}");
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;
    login_admin(&session, admin).await.map_err(|e| {
        error!("Failed to store admin in session: {e}");
        ApiError::InternalError(e.into())
    })?;
    Ok(Redirect::to("/admin/dashboard"))
}

async fn logout(session: Session) -> ApiResult<impl IntoResponse> {
    logout_admin(&session)
        .await
        .unwrap_or_else(|e| warn!("Failed to clear session: {e}"));
    Ok(Redirect::to("/admin/login"))
}

#[derive(Serialize)]
struct Dashboard {
    counts: ModerationCounts,
    admin: Admin,
}

async fn dashboard(
    CurrentAdmin(admin): CurrentAdmin,
    repository: NoteRepository,
) -> ApiResult<impl IntoResponse> {
    let counts = repository.counts().await?;
    Ok(Json(Dashboard { counts, admin }))
}

async fn manage_notes(
    _admin: CurrentAdmin,
    repository: NoteRepository,
) -> ApiResult<impl IntoResponse> {
    let notes = repository.list_all().await?;
    Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(
    _admin: CurrentAdmin,
    repository: NoteRepository,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let notes = match query.q.filter(|q| !q.is_empty()) {
        Some(term) => repository.admin_search(&term).await?,
        None => repository.list_all().await?,
    };
    Ok(Json(notes))
}

#[derive(Serialize)]
struct Reports {
    top_rated: Vec<Note>,
    most_downloaded: Vec<Note>,
}

async fn reports(
    _admin: CurrentAdmin,
    repository: NoteRepository,
) -> ApiResult<impl IntoResponse> {
    let top_rated = repository.top_rated_all(REPORT_SIZE).await?;
    let most_downloaded = repository.most_downloaded(REPORT_SIZE).await?;
    Ok(Json(Reports {
        top_rated,
        most_downloaded,
    }))
}

async fn remove_note(
    _admin: CurrentAdmin,
    repository: NoteRepository,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    repository.remove(id).await?;
    Ok(Redirect::to("/admin/manage-notes"))
}

/// Admin router - must be nested on the /admin path.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/manage-notes", get(manage_notes))
        .route("/search", get(search))
        .route("/reports", get(reports))
        .route("/remove/{id}", post(remove_note))
}
