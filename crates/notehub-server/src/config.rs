use core::panic;
use std::{fs, path::PathBuf};

use crate::error::Result;
pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "NOTEHUB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "NOTEHUB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "NOTEHUB_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the app, as visible to users (used in share links and OIDC redirects)"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "NOTEHUB_OIDC_CONFIG",
        help = "Path to OIDC configuration file, default is oidc-config.toml in data directory; external login is disabled when the file does not exist"
    )]
    pub oidc_config: Option<String>,

    #[arg(
        long,
        env = "NOTEHUB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db or similar, default is sqlite://[data-dir]/notehub.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "NOTEHUB_DATA_DIR",
        help = "Data directory (uploads, database, configs etc.), default is system default like ~/.local/share/notehub",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "NOTEHUB_UPLOADS_DIR",
        help = "Directory for uploaded note files and covers, default data_dir/uploads"
    )]
    uploads_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "NOTEHUB_PUBLIC_DIR",
        help = "Directory with static pages and assets, default data_dir/public"
    )]
    public_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "NOTEHUB_UPLOAD_LIMIT_MB",
        default_value = "100",
        help = "Maximum upload size in MB"
    )]
    pub upload_limit_mb: usize,

    #[arg(
        long,
        env = "NOTEHUB_EXEC_URL",
        default_value = "https://ce.judge0.com/",
        help = "Base URL of the code execution service"
    )]
    pub exec_url: Url,

    #[arg(
        long,
        env = "NOTEHUB_EXEC_API_KEY",
        help = "API key for the code execution service, if it requires one"
    )]
    pub exec_api_key: Option<String>,

    #[arg(
        long,
        env = "NOTEHUB_GENAI_URL",
        default_value = "https://generativelanguage.googleapis.com/v1/models/gemini-2.5-flash:generateContent",
        help = "Endpoint of the generative AI service"
    )]
    pub genai_url: Url,

    #[arg(
        long,
        env = "NOTEHUB_GENAI_API_KEY",
        help = "API key for the generative AI service; AI chat replies with an error message when unset"
    )]
    pub genai_api_key: Option<String>,

    #[arg(
        long,
        env = "NOTEHUB_ADMIN_USER",
        help = "Admin account to seed on startup (requires --admin-password)"
    )]
    pub admin_user: Option<String>,

    #[arg(
        long,
        env = "NOTEHUB_ADMIN_PASSWORD",
        hide_env_values = true,
        help = "Password for the seeded admin account"
    )]
    pub admin_password: Option<String>,

    #[arg(long, env = "NOTEHUB_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("notehub"))
        .unwrap_or_else(|| PathBuf::from("notehub"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("uploads"))
    }

    pub fn public_dir(&self) -> PathBuf {
        self.public_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("public"))
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/notehub.db", self.data_dir))
    }
}
