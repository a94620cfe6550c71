use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

use roam_gateway::dispatcher::DeliveryScope;

/// Placeholder JWT secret shipped for local development.
pub const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub delivery_scope: DeliveryScope,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("ROAM_HOST", "0.0.0.0");
        let port: u16 = var("ROAM_PORT", "5001")
            .parse()
            .context("ROAM_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let delivery_scope = var("ROAM_DELIVERY_SCOPE", "participants").parse()?;

        Ok(Self {
            addr,
            db_path: var("ROAM_DB_PATH", "roam.db").into(),
            jwt_secret: var("ROAM_JWT_SECRET", PLACEHOLDER_SECRET),
            delivery_scope,
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || self.jwt_secret == PLACEHOLDER_SECRET
    }
}
