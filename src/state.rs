use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    memory::MemoryStore,
    projects::{
        completions::{CompletionStore, PgCompletionStore},
        repo::{PgProjectStore, ProjectStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub completions: Arc<dyn CompletionStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let Some(database_url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data will not persist");
            return Ok(Self::in_memory(config));
        };

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgProjectStore::new(db.clone())),
            Arc::new(PgCompletionStore::new(db)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        projects: Arc<dyn ProjectStore>,
        completions: Arc<dyn CompletionStore>,
    ) -> Self {
        Self {
            config,
            users,
            projects,
            completions,
        }
    }

    /// All three stores backed by one shared `MemoryStore`.
    pub fn with_store(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        Self::from_parts(Arc::new(config), store.clone(), store.clone(), store)
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::default()))
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::in_memory(test_config())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    use crate::config::{CookieConfig, JwtConfig, MAX_TTL_MINUTES};

    AppConfig {
        database_url: None,
        max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: MAX_TTL_MINUTES,
        },
        cookie: CookieConfig {
            name: "access_token".into(),
            secure: true,
        },
        bcrypt_cost: 4,
        cors_allowed_origins: Vec::new(),
        host: "127.0.0.1".into(),
        port: 0,
    }
}
