use axum::{
    extract::{FromRequest as _, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Form, Json,
};
use garde::Validate as _;
use notehub_dal::user::{CreateUser, User, UserRepository};
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::{
    error::{ApiError, ApiResult},
    pages, repository_from_request,
    session::{login_user, logout_user},
    state::AppState,
};

pub mod oidc;

repository_from_request!(UserRepository);

#[derive(serde::Deserialize)]
struct LoginCredentials {
    email: String,
    password: String,
}

#[derive(serde::Deserialize)]
struct RegisterCredentials {
    name: String,
    email: String,
    password: String,
}

/// Both HTML forms and API clients post here, so the payload is read
/// according to the content type.
async fn read_body<T: serde::de::DeserializeOwned>(
    request: axum::extract::Request,
) -> ApiResult<T> {
    let content_type = request
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidRequest("Missing content type".to_string()))?;
    if content_type.starts_with("application/json") {
        let Json(data) = Json::<T>::from_request(request, &()).await.map_err(|e| {
            debug!("Failed to read JSON body: {e}");
            ApiError::InvalidRequest("Malformed body".to_string())
        })?;
        Ok(data)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(data) = Form::<T>::from_request(request, &()).await.map_err(|e| {
            debug!("Failed to read form body: {e}");
            ApiError::InvalidRequest("Malformed body".to_string())
        })?;
        Ok(data)
    } else {
        Err(ApiError::InvalidRequest(
            "Unsupported content type".to_string(),
        ))
    }
}

pub async fn register(
    user_registry: UserRepository,
    request: axum::extract::Request,
) -> ApiResult<impl IntoResponse> {
    let credentials: RegisterCredentials = read_body(request).await?;
    let payload = CreateUser {
        name: credentials.name,
        email: credentials.email.parse()?,
        password: Some(credentials.password),
    };
    payload.validate()?;
    let user = user_registry.create(payload).await?;
    debug!("Registered user {}", user.email);

    Ok(Redirect::to("/login"))
}

pub async fn after_ok_login(session: &Session, known_user: User) -> ApiResult<impl IntoResponse> {
    login_user(session, known_user).await.map_err(|e| {
        error!("Failed to store user in session: {e}");
        ApiError::InternalError(e.into())
    })?;
    Ok(Redirect::to("/"))
}

pub async fn login(
    user_registry: UserRepository,
    session: Session,
    request: axum::extract::Request,
) -> ApiResult<impl IntoResponse> {
    let credentials: LoginCredentials = read_body(request).await?;
    let user = user_registry
        .check_password(&credentials.email, &credentials.password)
        .await
        .map_err(|e| {
            debug!("User check error: {e}");
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;

    after_ok_login(&session, user).await
}

pub async fn logout(session: Session) -> ApiResult<impl IntoResponse> {
    logout_user(&session)
        .await
        .unwrap_or_else(|e| warn!("Failed to clear session: {e}"));
    Ok(Redirect::to("/"))
}

async fn login_page(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    pages::serve(&state, "login.html").await
}

async fn register_page(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    pages::serve(&state, "register.html").await
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .nest("/auth", oidc::router())
}
