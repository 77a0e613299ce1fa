use axum::{
    extract::FromRequestParts,
    response::{IntoResponse, Redirect, Response},
    RequestPartsExt as _,
};
use http::{request::Parts, StatusCode};
use notehub_dal::{admin::Admin, user::User};
use tower_sessions::Session;
use tracing::error;

pub const SESSION_COOKIE_NAME: &str = "notehub";
const SESSION_USER_KEY: &str = "user";
const SESSION_ADMIN_KEY: &str = "admin";

/// User and admin logins live in independent session slots, logging in
/// as admin does not touch a user login in the same browser.
pub async fn login_user(session: &Session, user: User) -> Result<(), tower_sessions::session::Error> {
    session.insert(SESSION_USER_KEY, user).await
}

pub async fn logout_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<User>(SESSION_USER_KEY).await.map(|_| ())
}

pub async fn login_admin(
    session: &Session,
    admin: Admin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(SESSION_ADMIN_KEY, admin).await
}

pub async fn logout_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Admin>(SESSION_ADMIN_KEY).await.map(|_| ())
}

/// Rejection redirecting the browser to the appropriate login page.
#[derive(Debug)]
pub struct AuthRedirect(&'static str);

impl AuthRedirect {
    fn to_login() -> Self {
        AuthRedirect("/login")
    }

    fn to_admin_login() -> Self {
        AuthRedirect("/admin/login")
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(self.0).into_response()
    }
}

/// Extractor for routes which require a logged in user.
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extract::<Session>().await.map_err(|e| {
            error!("Missing session layer: {}", e.1);
            AuthRedirect::to_login()
        })?;
        match session.get::<User>(SESSION_USER_KEY).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(AuthRedirect::to_login()),
            Err(e) => {
                error!("Failed to read session: {e}");
                Err(AuthRedirect::to_login())
            }
        }
    }
}

/// Extractor for routes which work both anonymously and logged in.
pub struct MaybeUser(pub Option<User>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extract::<Session>().await?;
        let user = session.get::<User>(SESSION_USER_KEY).await.map_err(|e| {
            error!("Failed to read session: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Session error")
        })?;
        Ok(MaybeUser(user))
    }
}

pub struct CurrentAdmin(pub Admin);

impl<S: Send + Sync> FromRequestParts<S> for CurrentAdmin {
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extract::<Session>().await.map_err(|e| {
            error!("Missing session layer: {}", e.1);
            AuthRedirect::to_admin_login()
        })?;
        match session.get::<Admin>(SESSION_ADMIN_KEY).await {
            Ok(Some(admin)) => Ok(CurrentAdmin(admin)),
            Ok(None) => Err(AuthRedirect::to_admin_login()),
            Err(e) => {
                error!("Failed to read session: {e}");
                Err(AuthRedirect::to_admin_login())
            }
        }
    }
}
