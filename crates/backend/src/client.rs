use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use trackhub_core::ItemId;

use crate::collection::{CollectionPath, CollectionQuery, SnapshotEvent};
use crate::error::{AuthError, WriteError};
use crate::session::Session;
use crate::subscription::Subscription;

/// Capability surface of the managed document store.
///
/// The stockroom core treats the backend as opaque: it can open an anonymous
/// session, watch session transitions, watch an ordered collection, and write
/// documents. Everything else (rules, indexes, persistence) is the service's
/// business.
///
/// ## Push streams
///
/// `session_changes` and `subscribe_ordered` return a [`Subscription`] that
/// delivers the current state immediately and every change after that. The
/// caller owns the subscription; cancelling or dropping it detaches the
/// listener.
///
/// ## Writes
///
/// - The server assigns document ids and creation timestamps.
/// - `insert_batch` is atomic: every document becomes visible or none does.
/// - `delete_document` on an unknown id succeeds (document-store semantics).
/// - A successful write shows up in the next snapshot of every live query on
///   the same path. Return values never patch local state.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
    /// Request an anonymous session. Success is observed via `session_changes`.
    async fn create_anonymous_session(&self) -> Result<(), AuthError>;

    /// Live stream of the current session (`None` while signed out).
    fn session_changes(&self) -> Subscription<Option<Session>>;

    /// Live stream of full, ordered snapshots of one collection.
    fn subscribe_ordered(&self, query: &CollectionQuery) -> Subscription<SnapshotEvent>;

    async fn insert_document(
        &self,
        path: &CollectionPath,
        fields: JsonValue,
    ) -> Result<ItemId, WriteError>;

    async fn insert_batch(
        &self,
        path: &CollectionPath,
        documents: Vec<JsonValue>,
    ) -> Result<Vec<ItemId>, WriteError>;

    async fn delete_document(&self, path: &CollectionPath, id: &ItemId) -> Result<(), WriteError>;
}

#[async_trait]
impl<C> RemoteCollectionClient for Arc<C>
where
    C: RemoteCollectionClient + ?Sized,
{
    async fn create_anonymous_session(&self) -> Result<(), AuthError> {
        (**self).create_anonymous_session().await
    }

    fn session_changes(&self) -> Subscription<Option<Session>> {
        (**self).session_changes()
    }

    fn subscribe_ordered(&self, query: &CollectionQuery) -> Subscription<SnapshotEvent> {
        (**self).subscribe_ordered(query)
    }

    async fn insert_document(
        &self,
        path: &CollectionPath,
        fields: JsonValue,
    ) -> Result<ItemId, WriteError> {
        (**self).insert_document(path, fields).await
    }

    async fn insert_batch(
        &self,
        path: &CollectionPath,
        documents: Vec<JsonValue>,
    ) -> Result<Vec<ItemId>, WriteError> {
        (**self).insert_batch(path, documents).await
    }

    async fn delete_document(&self, path: &CollectionPath, id: &ItemId) -> Result<(), WriteError> {
        (**self).delete_document(path, id).await
    }
}
