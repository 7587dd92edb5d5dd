//! Remote collection layer: the document-store capability the stockroom
//! core talks to, its configuration, and an in-memory implementation.
//!
//! The core never reaches a backend through a global handle; it is handed one
//! `Arc<dyn RemoteCollectionClient>` at startup.

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod in_memory;
pub mod session;
pub mod subscription;

pub use client::RemoteCollectionClient;
pub use collection::{CollectionPath, CollectionQuery, OrderDirection, SnapshotEvent, StoredDocument};
pub use config::BackendConfig;
pub use error::{AuthError, ConfigError, SubscriptionError, WriteError};
pub use in_memory::{CallLog, Faults, InMemoryBackend};
pub use session::Session;
pub use subscription::{Subscription, SubscriptionSender};
