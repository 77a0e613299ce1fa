use std::time::Duration;

use anyhow::{anyhow, Result};
use notehub_app::state::AppState;
use notehub_server::config::{Parser as _, ServerConfig};
use notehub_server::{build_state, run::run_with_state};
use rand::Rng as _;
use tempfile::TempDir;
use tracing::error;
use url::Url;

pub const ADMIN_USER: &str = "boss";
pub const ADMIN_PASSWORD: &str = "supersecret";

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "notehub-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--admin-user",
        ADMIN_USER,
        "--admin-password",
        ADMIN_PASSWORD,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Builds the server configuration and state for one test: temporary data
/// directory, random port, migrated database, seeded admin account. Keep the
/// guard alive for the whole test.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, AppState, ConfigGuard)> {
    let (config, guard) = test_config(test_name)?;
    let state = build_state(&config).await?;
    Ok((config, state, guard))
}

/// Runs the server in a background task and waits until it answers health
/// checks.
pub async fn spawn_server(config: ServerConfig, state: AppState) -> Result<()> {
    let base_url = config.base_url.clone();
    tokio::spawn(async move {
        if let Err(e) = run_with_state(config, state).await {
            error!("Server failed: {e}");
        }
    });
    wait_healthy(&base_url).await
}

async fn wait_healthy(base_url: &Url) -> Result<()> {
    let client = reqwest::Client::new();
    let url = base_url.join("health")?;
    for _ in 0..50 {
        if let Ok(response) = client.get(url.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not become healthy"))
}

/// Client keeping session cookies but not following redirects, so tests can
/// assert on redirect targets.
pub fn browser_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

pub async fn login_user(
    client: &reqwest::Client,
    base_url: &Url,
    email: &str,
    password: &str,
) -> Result<()> {
    let response = client
        .post(base_url.join("login")?)
        .json(&serde_json::json!({"email": email, "password": password}))
        .send()
        .await?;
    if !response.status().is_redirection() {
        return Err(anyhow!("Login failed with status {}", response.status()));
    }
    Ok(())
}

pub fn location_header(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
