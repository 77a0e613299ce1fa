use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use notehub_app::session::SESSION_COOKIE_NAME;
use notehub_app::state::{AppConfig, AppState};
use notehub_app::{admin, auth, notes, playground, snippet};
use notehub_dal::admin::AdminRepository;
use notehub_remote::{ExecClient, GenAiClient};
use notehub_store::FileStore;
use notehub_types::oidc::OIDCConfig;
use tokio::task::spawn_blocking;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(&args, state);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn main_router(args: &ServerConfig, state: AppState) -> Router<()> {
    let session_store = tower_sessions::MemoryStore::default();
    let session_layer = tower_sessions::SessionManagerLayer::new(session_store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(false)
        .with_expiry(tower_sessions::Expiry::OnSessionEnd);

    Router::new()
        .merge(notes::router(args.upload_limit_mb))
        .merge(auth::router())
        .merge(playground::router())
        .merge(snippet::router())
        .nest("/admin", admin::router())
        .layer(session_layer)
        .with_state(state)
        .route("/health", get(health))
        // uploaded files and covers are served back verbatim
        .nest_service("/uploads", ServeDir::new(args.uploads_dir()))
        .fallback_service(ServeDir::new(args.public_dir()))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    let oidc_config_file = config.oidc_config.clone().unwrap_or_else(|| {
        let path = data_dir.join("oidc-config.toml");
        path.to_string_lossy().to_string()
    });
    let oidc_config = if tokio::fs::try_exists(&oidc_config_file).await? {
        spawn_blocking(move || OIDCConfig::load_config(&oidc_config_file)).await??
    } else {
        warn!("No OIDC configuration at {oidc_config_file}, external login disabled");
        OIDCConfig::default()
    };

    let uploads_dir = config.uploads_dir();
    if !uploads_dir.is_dir() {
        tokio::fs::create_dir_all(&uploads_dir).await?;
        info!("Created directory for uploaded files");
    }

    let app_config = AppConfig {
        base_url: config.base_url.clone(),
        public_dir: config.public_dir(),
        upload_limit_mb: config.upload_limit_mb,
    };

    let pool = notehub_dal::new_pool(&config.database_url()).await?;
    notehub_dal::migrate(&pool).await?;

    if let (Some(user), Some(password)) = (&config.admin_user, &config.admin_password) {
        AdminRepository::new(pool.clone())
            .ensure(user, password)
            .await?;
    }

    let store = FileStore::new(&uploads_dir);
    let exec = ExecClient::new(config.exec_url.clone(), config.exec_api_key.clone());
    let genai = GenAiClient::new(config.genai_url.clone(), config.genai_api_key.clone());

    Ok(AppState::new(
        oidc_config,
        app_config,
        pool,
        store,
        exec,
        genai,
    ))
}
