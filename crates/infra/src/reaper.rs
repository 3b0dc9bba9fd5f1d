//! Stale account reaping.
//!
//! Accounts move ACTIVE → CANDIDATE once their last activity falls behind the
//! threshold, and CANDIDATE → DELETED when reaped. A reaped account's cart
//! goes with it. Notification is a side
//! channel: it happens only after a deletion is acknowledged and its failure
//! never restores the account.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use storefront_auth::User;
use storefront_core::Clock;

use crate::error::ServiceError;
use crate::hooks::{HookReport, PostCommitHooks};
use crate::notify::{Notification, Notifier};
use crate::store::{CartStore, UserStore};
use crate::users::discard_cart;

pub const DEFAULT_THRESHOLD_DAYS: u32 = 2;

/// A restartable query for accounts idle longer than a threshold.
///
/// Nothing is read until [`StaleUsers::fetch`]; each call re-evaluates "now".
#[derive(Clone)]
pub struct StaleUsers {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    threshold_days: u32,
}

impl StaleUsers {
    pub fn threshold_days(&self) -> u32 {
        self.threshold_days
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        now.checked_sub_signed(Duration::days(i64::from(self.threshold_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub async fn fetch(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.inactive_since(self.cutoff()).await?)
    }
}

/// Outcome of a reaping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Accounts actually deleted. Zero means nothing was reaped.
    pub deleted: usize,
    /// Candidates whose deletion failed; they were left untouched.
    pub failed: usize,
    pub notifications: HookReport,
}

#[derive(Clone)]
pub struct StaleAccountReaper {
    users: Arc<dyn UserStore>,
    carts: Arc<dyn CartStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl StaleAccountReaper {
    pub fn new(
        users: Arc<dyn UserStore>,
        carts: Arc<dyn CartStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { users, carts, notifier, clock }
    }

    pub fn find_stale_users(&self, threshold_days: u32) -> StaleUsers {
        StaleUsers {
            users: self.users.clone(),
            clock: self.clock.clone(),
            threshold_days,
        }
    }

    /// Delete each account, then notify the holders of the deleted ones.
    ///
    /// A failing deletion is logged and skipped; the rest of the batch still
    /// runs.
    pub async fn reap_and_notify(&self, stale: Vec<User>) -> ReapReport {
        let mut report = ReapReport::default();
        let mut hooks = PostCommitHooks::new();

        for user in stale {
            match self.users.delete(user.id).await {
                Ok(true) => {
                    report.deleted += 1;
                    tracing::info!(user_id = %user.id, email = %user.email, "stale account deleted");
                    if let Some(cart_id) = user.cart_id {
                        discard_cart(self.carts.as_ref(), cart_id).await;
                    }
                    hooks.notify(user.email.clone(), Notification::account_closed(&user.email));
                }
                Ok(false) => {
                    tracing::info!(user_id = %user.id, "stale account already gone");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("failed to delete stale account {}: {e}", user.id);
                }
            }
        }

        report.notifications = hooks.flush(self.notifier.as_ref()).await;
        report
    }

    /// Find and reap in one pass.
    pub async fn sweep(&self, threshold_days: u32) -> Result<ReapReport, ServiceError> {
        let stale = self.find_stale_users(threshold_days).fetch().await?;
        let report = self.reap_and_notify(stale).await;
        tracing::info!(
            deleted = report.deleted,
            failed = report.failed,
            notify_failed = report.notifications.failed,
            "stale account sweep finished"
        );
        Ok(report)
    }
}
