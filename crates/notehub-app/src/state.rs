use std::{path::PathBuf, sync::Arc};

use crate::error::Result;
use notehub_remote::{ExecClient, GenAiClient};
use notehub_store::FileStore;
use notehub_types::oidc::OIDCConfig;
use sqlx::Pool;
use url::Url;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        oidc_config: OIDCConfig,
        app_config: AppConfig,
        pool: Pool<sqlx::Sqlite>,
        store: FileStore,
        exec: ExecClient,
        genai: GenAiClient,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                oidc_providers_config: oidc_config,
                app_config,
                pool,
                store,
                exec,
                genai,
            }),
        }
    }

    pub fn get_oidc_provider(&self, name: &str) -> Option<notehub_types::oidc::OIDCProviderConfig> {
        self.state.oidc_providers_config.get_provider(name).cloned()
    }

    pub fn get_app_config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url> {
        let base = &self.get_app_config().base_url;
        let url = base.join(relative_url)?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool<sqlx::Sqlite> {
        &self.state.pool
    }

    pub fn store(&self) -> &FileStore {
        &self.state.store
    }

    pub fn exec(&self) -> &ExecClient {
        &self.state.exec
    }

    pub fn genai(&self) -> &GenAiClient {
        &self.state.genai
    }
}

struct AppStateInner {
    pool: Pool<sqlx::Sqlite>,
    oidc_providers_config: OIDCConfig,
    app_config: AppConfig,
    store: FileStore,
    exec: ExecClient,
    genai: GenAiClient,
}

pub struct AppConfig {
    pub base_url: Url,
    pub public_dir: PathBuf,
    pub upload_limit_mb: usize,
}
