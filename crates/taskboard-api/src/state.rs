use std::sync::Arc;

use taskboard_db::Database;

use crate::config::Config;
use crate::error::ApiError;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

impl AppStateInner {
    pub fn new(db: Database, config: &Config) -> AppState {
        Arc::new(Self {
            db,
            tokens: TokenService::new(&config.jwt_secret, config.token_ttl),
        })
    }

    /// Runs a blocking database call off the async runtime.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let value = tokio::task::spawn_blocking(move || f(&state.db)).await??;
        Ok(value)
    }
}
