//! Abstract interfaces the engine consumes.
//!
//! These traits define the contracts for:
//! - Platform persistence (users, investments, opportunities, withdrawals)
//! - Notification dispatch (fire-and-forget user messaging)

pub mod notifier;
pub mod store;

pub use notifier::{NotificationDispatch, NotificationKind, NotifyError};
pub use store::{PlatformStore, StoreError};
