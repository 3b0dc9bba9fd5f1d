//! Post-commit side effects.
//!
//! A mutation that needs follow-up work (notifications) returns its result
//! wrapped in [`Committed`]. The hooks run only when the caller flushes them,
//! after storage has acknowledged the mutation; a failing hook never undoes it.

use serde::Serialize;

use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCommitAction {
    Notify {
        recipient: String,
        notification: Notification,
    },
}

/// Outcome of flushing a hook list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HookReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCommitHooks {
    actions: Vec<PostCommitAction>,
}

impl PostCommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: PostCommitAction) {
        self.actions.push(action);
    }

    pub fn notify(&mut self, recipient: impl Into<String>, notification: Notification) {
        self.push(PostCommitAction::Notify {
            recipient: recipient.into(),
            notification,
        });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every queued action. Failures are logged and counted.
    pub async fn flush(self, notifier: &dyn Notifier) -> HookReport {
        let mut report = HookReport::default();
        for action in self.actions {
            report.attempted += 1;
            match action {
                PostCommitAction::Notify { recipient, notification } => {
                    match notifier.notify(&recipient, &notification).await {
                        Ok(()) => report.succeeded += 1,
                        Err(e) => {
                            tracing::warn!("post-commit notification failed: {e}");
                            report.failed += 1;
                        }
                    }
                }
            }
        }
        report
    }
}

/// A committed mutation plus the side effects still owed for it.
#[must_use = "post-commit hooks must be flushed"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub hooks: PostCommitHooks,
}

impl<T> Committed<T> {
    pub fn new(value: T, hooks: PostCommitHooks) -> Self {
        Self { value, hooks }
    }

    pub fn without_hooks(value: T) -> Self {
        Self::new(value, PostCommitHooks::new())
    }

    /// Flush the hooks and hand back the committed value.
    pub async fn finish(self, notifier: &dyn Notifier) -> (T, HookReport) {
        let report = self.hooks.flush(notifier).await;
        (self.value, report)
    }
}
