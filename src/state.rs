use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::jwt::TokenKeys;
use crate::auth::services::AccountService;
use crate::config::AppConfig;
use crate::users::repo::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = UserStore::open(&config.data_dir).await?;
        let keys = TokenKeys::new(&config.jwt.secret);
        Ok(Self {
            accounts: AccountService::new(store, keys),
            config,
        })
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.keys().clone()
    }
}
