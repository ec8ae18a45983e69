use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Signing key used when JWT_SECRET is unset outside production.
const DEV_JWT_SECRET: &str = "insecure-dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ if production => {
                anyhow::bail!("JWT_SECRET must be set to a non-empty value in production")
            }
            _ => {
                warn!("JWT_SECRET not set; using the built-in development secret");
                DEV_JWT_SECRET.into()
            }
        };
        Ok(Self {
            data_dir,
            jwt: JwtConfig { secret },
        })
    }
}
