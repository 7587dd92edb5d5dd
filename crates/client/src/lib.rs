//! `trackhub-client`
//!
//! **Responsibility:** the live core behind the stockroom dashboard.
//!
//! This crate provides:
//! - A session gate (one anonymous sign-in, then follow the ambient session)
//! - A live inventory store (one subscription per session, full-replace snapshots)
//! - A self-expiring notification queue
//!
//! All persistence, sync and auth are delegated to a
//! [`RemoteCollectionClient`](trackhub_backend::RemoteCollectionClient) handed
//! in at startup. Rendering is left to whatever sits on top.

pub mod app;
pub mod config;
pub mod notifications;
pub mod session;
pub mod store;

pub use app::AppContext;
pub use config::{AppConfig, ClientConfig};
pub use notifications::{Notification, NotificationId, NotificationKind, NotificationQueue};
pub use session::SessionGate;
pub use store::{InventoryState, InventoryStore, StoreError, SyncPhase};
