//! Infrastructure and application services.
//!
//! Storage and notification collaborators sit behind async traits; the
//! lifecycle services compose them with the pure policy and domain crates.

pub mod carts;
pub mod catalog;
pub mod error;
pub mod hooks;
pub mod notify;
pub mod reaper;
pub mod store;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use carts::CartAggregator;
pub use catalog::ProductLifecycle;
pub use error::ServiceError;
pub use hooks::{Committed, HookReport, PostCommitAction, PostCommitHooks};
pub use notify::{LogNotifier, Notification, Notifier, NotifyError, RecordingNotifier};
pub use reaper::{ReapReport, StaleAccountReaper, StaleUsers};
pub use store::{CartStore, ProductStore, StoreError, UserStore};
pub use users::UserAdmin;
