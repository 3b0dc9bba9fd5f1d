//! Service wiring: storage backend selection and the shared service bundle.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use storefront_core::{Clock, SystemClock};
use storefront_infra::store::{
    CartStore, InMemoryCartStore, InMemoryProductStore, InMemoryUserStore, PostgresCartStore,
    PostgresProductStore, PostgresUserStore, ProductStore, UserStore, ensure_schema,
};
use storefront_infra::{CartAggregator, LogNotifier, Notifier, ProductLifecycle, StaleAccountReaper, UserAdmin};

use crate::config::AppConfig;

/// Everything the handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: ProductLifecycle,
    pub carts: CartAggregator,
    pub users: UserAdmin,
    pub reaper: StaleAccountReaper,
    pub notifier: Arc<dyn Notifier>,
    pub stale_account_days: u32,
}

impl AppServices {
    pub fn new(
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
        carts: Arc<dyn CartStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        stale_account_days: u32,
    ) -> Self {
        Self {
            catalog: ProductLifecycle::new(products.clone(), clock.clone()),
            carts: CartAggregator::new(carts.clone(), products),
            users: UserAdmin::new(users.clone(), carts.clone(), clock.clone()),
            reaper: StaleAccountReaper::new(users, carts, notifier.clone(), clock),
            notifier,
            stale_account_days,
        }
    }

    /// In-memory stores, wall clock, log-only notifications.
    pub fn in_memory(stale_account_days: u32) -> Self {
        Self::new(
            Arc::new(InMemoryProductStore::new()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryCartStore::new()),
            Arc::new(LogNotifier),
            Arc::new(SystemClock),
            stale_account_days,
        )
    }

    pub async fn postgres(database_url: &str, stale_account_days: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("failed to connect to DATABASE_URL")?;
        ensure_schema(&pool).await.context("failed to prepare schema")?;

        Ok(Self::new(
            Arc::new(PostgresProductStore::new(pool.clone())),
            Arc::new(PostgresUserStore::new(pool.clone())),
            Arc::new(PostgresCartStore::new(pool)),
            Arc::new(LogNotifier),
            Arc::new(SystemClock),
            stale_account_days,
        ))
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                tracing::info!("using postgres storage");
                Self::postgres(url, config.stale_account_days).await
            }
            None => {
                tracing::info!("DATABASE_URL not set; using in-memory storage");
                Ok(Self::in_memory(config.stale_account_days))
            }
        }
    }
}
