//! Environment-driven configuration.

use std::net::SocketAddr;

use anyhow::Context;

use storefront_infra::reaper::DEFAULT_THRESHOLD_DAYS;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// Selects the Postgres stores when set; in-memory otherwise.
    pub database_url: Option<String>,
    pub stale_account_days: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind = lookup("STOREFRONT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind
            .parse()
            .with_context(|| format!("STOREFRONT_BIND is not a socket address: '{bind}'"))?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let stale_account_days = match lookup("STALE_ACCOUNT_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("STALE_ACCOUNT_DAYS must be a non-negative integer: '{raw}'"))?,
            None => DEFAULT_THRESHOLD_DAYS,
        };

        Ok(Self {
            bind,
            jwt_secret,
            database_url,
            stale_account_days,
        })
    }
}
