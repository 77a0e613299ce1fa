use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Extension,
};
use notehub_auth::oidc::{OIDCClient, OIDCSecrets};
use notehub_dal::user::{CreateUser, UserRepository};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, error, info};

use crate::{
    auth::after_ok_login,
    error::{ApiError, ApiResult},
    state::AppState,
};

const SESSION_SECRETS_KEY: &str = "oidc_secrets";
const SESSION_PROVIDER_KEY: &str = "oidc_provider";

#[derive(Clone)]
pub struct ProvidersCache {
    providers: Arc<RwLock<HashMap<String, OIDCClient>>>,
}

impl Default for ProvidersCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvidersCache {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get_provider(&self, name: impl AsRef<str>) -> Option<OIDCClient> {
        self.providers.read().unwrap().get(name.as_ref()).cloned()
    }

    pub fn set_provider(&self, name: impl Into<String>, client: OIDCClient) {
        self.providers.write().unwrap().insert(name.into(), client);
    }
}

async fn client_for(
    state: &AppState,
    cache: &ProvidersCache,
    provider_id: &str,
) -> ApiResult<OIDCClient> {
    if let Some(client) = cache.get_provider(provider_id) {
        return Ok(client);
    }

    let provider = state
        .get_oidc_provider(provider_id)
        .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown provider {provider_id}")))?;
    let redirect_url = state.build_url("auth/callback")?;
    let client = OIDCClient::discover(&provider, redirect_url)
        .await
        .map_err(|e| {
            error!("Failed to discover OIDC provider {provider_id}: {e}");
            ApiError::InternalError(e)
        })?;
    cache.set_provider(provider_id, client.clone());
    Ok(client)
}

pub async fn login(
    State(state): State<AppState>,
    Extension(cache): Extension<ProvidersCache>,
    Path(provider): Path<String>,
    session: Session,
) -> ApiResult<impl IntoResponse> {
    let client = client_for(&state, &cache, &provider).await?;
    let (url, secrets) = client.auth_url();
    session
        .insert(SESSION_PROVIDER_KEY, provider)
        .await
        .map_err(|e| {
            error!("Failed to store provider in session: {e}");
            ApiError::InternalError(e.into())
        })?;
    session
        .insert(SESSION_SECRETS_KEY, secrets)
        .await
        .map_err(|e| {
            error!("Failed to store secrets in session: {e}");
            ApiError::InternalError(e.into())
        })?;
    Ok(Redirect::temporary(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

pub async fn callback(
    State(state): State<AppState>,
    Extension(cache): Extension<ProvidersCache>,
    session: Session,
    user_registry: UserRepository,
    Query(params): Query<CallbackQuery>,
) -> ApiResult<impl IntoResponse> {
    let provider: String = session
        .get(SESSION_PROVIDER_KEY)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| ApiError::InvalidRequest("Missing provider in session".to_string()))?;
    let secrets: OIDCSecrets = session
        .get(SESSION_SECRETS_KEY)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| ApiError::InvalidRequest("Missing secrets in session".to_string()))?;

    let client = client_for(&state, &cache, &provider).await?;
    let identity = client
        .token(params.code, &params.state, secrets)
        .await
        .map_err(|e| {
            error!("Failed to get token: {e}");
            ApiError::Unauthorized("External login failed".to_string())
        })?;
    debug!("Authenticated via {provider}: {}", identity.email);

    let known_user = match user_registry.find_by_email(&identity.email).await? {
        Some(user) => user,
        None => {
            // first external login provisions a local account without password
            info!("Provisioning account for {}", identity.email);
            user_registry
                .create(CreateUser {
                    name: identity.name,
                    email: identity.email.parse()?,
                    password: None,
                })
                .await?
        }
    };

    after_ok_login(&session, known_user).await
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/callback", get(callback))
        .route("/{provider}", get(login))
        .layer(Extension(ProvidersCache::new()))
}
