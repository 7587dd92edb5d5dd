//! In-memory document store for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;

use trackhub_core::{ItemId, UserId};

use crate::client::RemoteCollectionClient;
use crate::collection::{CollectionPath, CollectionQuery, OrderDirection, SnapshotEvent, StoredDocument};
use crate::error::{AuthError, SubscriptionError, WriteError};
use crate::session::Session;
use crate::subscription::{self, Subscription, SubscriptionSender};

/// Failures to inject into subsequent calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Reject anonymous sign-in.
    pub fail_sign_in: bool,
    /// Fail every insert, batch and delete with this error.
    pub write_error: Option<WriteError>,
    /// Fail every new live query with this error.
    pub read_error: Option<SubscriptionError>,
}

/// Number of calls received per operation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub sign_ins: usize,
    pub subscribes: usize,
    pub inserts: usize,
    pub batches: usize,
    pub deletes: usize,
}

impl CallLog {
    /// Calls that would have touched stored documents.
    pub fn writes(&self) -> usize {
        self.inserts + self.batches + self.deletes
    }
}

struct Listener {
    query: CollectionQuery,
    sender: SubscriptionSender<SnapshotEvent>,
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, Vec<StoredDocument>>,
    listeners: Vec<Listener>,
    session: Option<Session>,
    session_listeners: Vec<SubscriptionSender<Option<Session>>>,
    last_timestamp: Option<DateTime<Utc>>,
    faults: Faults,
    calls: CallLog,
}

/// In-memory document store with live queries.
///
/// - Documents are kept per path in insertion (= creation) order
/// - Server timestamps are strictly increasing
/// - Every write fans out a fresh full snapshot to each live query on its path
/// - Cancelled listeners are dropped on the next delivery
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        let backend = Self::default();
        backend.set_faults(faults);
        backend
    }

    // A poisoned lock only means a panic elsewhere; the data is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls
    }

    /// Current contents of `path`, newest first.
    pub fn documents(&self, path: &CollectionPath) -> Vec<StoredDocument> {
        let state = self.lock();
        ordered(&state.collections, &CollectionQuery::newest_first(path.clone()))
    }

    /// Live queries on `path` that have not been cancelled.
    pub fn active_listeners(&self, path: &CollectionPath) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|l| l.query.path == *path && !l.sender.is_closed())
            .count()
    }

    /// Force a session transition (sign-out, account switch) and notify listeners.
    pub fn set_session(&self, session: Option<Session>) {
        let mut state = self.lock();
        state.session = session.clone();
        state.session_listeners.retain(|tx| tx.send(session.clone()));
    }

    /// Fail every live query on `path`. Failed queries deliver nothing further.
    pub fn fail_subscriptions(&self, path: &CollectionPath, error: SubscriptionError) {
        let mut state = self.lock();
        state.listeners.retain(|l| {
            if l.query.path != *path {
                return true;
            }
            l.sender.send(SnapshotEvent::Error(error.clone()));
            false
        });
    }

    fn check_write(state: &State) -> Result<(), WriteError> {
        match &state.faults.write_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_timestamp(state: &mut State) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match state.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        state.last_timestamp = Some(ts);
        ts
    }

    fn broadcast(state: &mut State, path: &CollectionPath) {
        let collections = &state.collections;
        state.listeners.retain(|l| {
            if l.query.path != *path {
                return !l.sender.is_closed();
            }
            l.sender
                .send(SnapshotEvent::Snapshot(ordered(collections, &l.query)))
        });
    }
}

fn ordered(
    collections: &HashMap<CollectionPath, Vec<StoredDocument>>,
    query: &CollectionQuery,
) -> Vec<StoredDocument> {
    let mut docs = collections.get(&query.path).cloned().unwrap_or_default();
    // Only the creation timestamp is indexed.
    docs.sort_by_key(|d| d.created_at);
    if query.direction == OrderDirection::Descending {
        docs.reverse();
    }
    docs
}

fn ensure_object(fields: &JsonValue) -> Result<(), WriteError> {
    if fields.is_object() {
        Ok(())
    } else {
        Err(WriteError::InvalidDocument(
            "document body must be a JSON object".to_string(),
        ))
    }
}

#[async_trait]
impl RemoteCollectionClient for InMemoryBackend {
    async fn create_anonymous_session(&self) -> Result<(), AuthError> {
        let mut state = self.lock();
        state.calls.sign_ins += 1;

        if state.faults.fail_sign_in {
            return Err(AuthError::Rejected(
                "anonymous sign-in is disabled for this project".to_string(),
            ));
        }
        if state.session.is_some() {
            return Ok(());
        }

        let session = Session::anonymous(UserId::new(), Utc::now());
        tracing::debug!(uid = %session.uid(), "anonymous session created");
        state.session = Some(session.clone());
        state
            .session_listeners
            .retain(|tx| tx.send(Some(session.clone())));
        Ok(())
    }

    fn session_changes(&self) -> Subscription<Option<Session>> {
        let (tx, sub) = subscription::channel();
        let mut state = self.lock();
        if tx.send(state.session.clone()) {
            state.session_listeners.push(tx);
        }
        sub
    }

    fn subscribe_ordered(&self, query: &CollectionQuery) -> Subscription<SnapshotEvent> {
        let (tx, sub) = subscription::channel();
        let mut state = self.lock();
        state.calls.subscribes += 1;

        if let Some(err) = state.faults.read_error.clone() {
            tx.send(SnapshotEvent::Error(err));
            return sub;
        }

        let snapshot = ordered(&state.collections, query);
        if tx.send(SnapshotEvent::Snapshot(snapshot)) {
            state.listeners.push(Listener {
                query: query.clone(),
                sender: tx,
            });
        }
        sub
    }

    async fn insert_document(
        &self,
        path: &CollectionPath,
        fields: JsonValue,
    ) -> Result<ItemId, WriteError> {
        let mut state = self.lock();
        state.calls.inserts += 1;
        Self::check_write(&state)?;
        ensure_object(&fields)?;

        let doc = StoredDocument {
            id: ItemId::new(),
            created_at: Self::next_timestamp(&mut state),
            fields,
        };
        let id = doc.id;
        state.collections.entry(path.clone()).or_default().push(doc);
        Self::broadcast(&mut state, path);
        Ok(id)
    }

    async fn insert_batch(
        &self,
        path: &CollectionPath,
        documents: Vec<JsonValue>,
    ) -> Result<Vec<ItemId>, WriteError> {
        let mut state = self.lock();
        state.calls.batches += 1;
        Self::check_write(&state)?;

        // Validate everything before touching the collection (all or nothing).
        for (idx, fields) in documents.iter().enumerate() {
            ensure_object(fields).map_err(|_| {
                WriteError::InvalidDocument(format!("batch entry {idx} is not a JSON object"))
            })?;
        }

        let mut staged = Vec::with_capacity(documents.len());
        for fields in documents {
            staged.push(StoredDocument {
                id: ItemId::new(),
                created_at: Self::next_timestamp(&mut state),
                fields,
            });
        }
        let ids = staged.iter().map(|d| d.id).collect();
        state.collections.entry(path.clone()).or_default().extend(staged);
        Self::broadcast(&mut state, path);
        Ok(ids)
    }

    async fn delete_document(&self, path: &CollectionPath, id: &ItemId) -> Result<(), WriteError> {
        let mut state = self.lock();
        state.calls.deletes += 1;
        Self::check_write(&state)?;

        let removed = match state.collections.get_mut(path) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != *id);
                docs.len() != before
            }
            None => false,
        };
        if removed {
            Self::broadcast(&mut state, path);
        }
        Ok(())
    }
}
