//! Notification collaborator.
//!
//! The services decide *when* to notify and *what* to say; delivery belongs to
//! a [`Notifier`].

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use storefront_core::ProductId;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub subject: String,
    pub body_lines: Vec<String>,
}

impl Notification {
    /// Sent to a premium owner after deleting one of their products.
    pub fn product_deleted(product_id: ProductId, deleted_by: &str) -> Self {
        Self {
            title: "Product removed".to_string(),
            subject: "A product was removed from the store".to_string(),
            body_lines: vec![
                format!("The product with id '{product_id}' was removed from the store."),
                format!("The action was performed by '{deleted_by}'."),
            ],
        }
    }

    /// Sent to an account holder once their inactive account has been deleted.
    pub fn account_closed(email: &str) -> Self {
        Self {
            title: "Account closed".to_string(),
            subject: "Your account was closed due to inactivity".to_string(),
            body_lines: vec![
                format!("The account '{email}' has been closed."),
                "It was removed after a period of inactivity.".to_string(),
            ],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery to '{recipient}' failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient,
            subject = %notification.subject,
            body = %notification.body_lines.join(" "),
            "notification dispatched"
        );
        Ok(())
    }
}

/// Keeps every delivered notification in memory.
///
/// Recipients registered through [`RecordingNotifier::fail_for`] get a
/// delivery error instead.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<(String, Notification)>>,
    failing: RwLock<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: impl Into<String>) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(recipient.into());
        }
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, notification: &Notification) -> Result<(), NotifyError> {
        let rejected = self
            .failing
            .read()
            .map(|f| f.contains(recipient))
            .unwrap_or(false);
        if rejected {
            return Err(NotifyError::Delivery {
                recipient: recipient.to_string(),
                reason: "mailbox unavailable".to_string(),
            });
        }

        let mut sent = self.sent.write().map_err(|_| NotifyError::Delivery {
            recipient: recipient.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        sent.push((recipient.to_string(), notification.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_records_and_fails_on_demand() {
        let notifier = RecordingNotifier::new();
        notifier.fail_for("down@shop.test");

        let n = Notification::account_closed("a@shop.test");
        notifier.notify("a@shop.test", &n).await.unwrap();
        assert!(notifier.notify("down@shop.test", &n).await.is_err());

        assert_eq!(notifier.sent(), vec![("a@shop.test".to_string(), n)]);
    }

    #[test]
    fn product_deleted_names_product_and_actor() {
        let id = ProductId::new();
        let n = Notification::product_deleted(id, "seller@shop.test");
        assert!(n.body_lines[0].contains(&id.to_string()));
        assert!(n.body_lines[1].contains("seller@shop.test"));
    }
}
