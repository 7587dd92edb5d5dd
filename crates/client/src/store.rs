//! Live inventory store.
//!
//! Follows the session, keeps exactly one ordered live query open per session,
//! and publishes each snapshot wholesale. Writes go straight to the remote
//! collection; the local list changes only when the next snapshot arrives.
//!
//! ## Single writer
//!
//! The published [`InventoryState`] is written by one place only: the driver
//! task spawned in [`InventoryStore::start`], which owns the `watch::Sender`.
//! Everything else (including the store's own write operations) only reads.
//!
//! ## Phases
//!
//! ```text
//! Uninitialized ──session──▶ Subscribing ──snapshot──▶ Synced ◀─┐
//!       ▲                        │                       │      │ snapshot
//!       │                        └──error──▶ Failed      └──────┘
//!       └────────────── session lost ──────────────────────────
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use trackhub_backend::{
    CollectionPath, CollectionQuery, RemoteCollectionClient, Session, SnapshotEvent,
    StoredDocument, SubscriptionError, WriteError,
};
use trackhub_core::{DomainError, ItemId, has_unique_ids};
use trackhub_inventory::{InventoryItem, InventorySummary, ItemFields, NewItem, sample_items};

use crate::config::ClientConfig;
use crate::notifications::NotificationQueue;

pub const MSG_ADDED: &str = "Produto adicionado com sucesso!";
pub const MSG_ADD_FAILED: &str = "Erro ao salvar item.";
pub const MSG_INVALID: &str = "Preencha os campos obrigatórios do produto.";
pub const MSG_DELETED: &str = "Item removido do estoque.";
pub const MSG_DELETE_FAILED: &str = "Erro ao excluir item.";
pub const MSG_SEEDED: &str = "Dados de teste gerados!";
pub const MSG_SEED_FAILED: &str = "Erro ao gerar dados.";
pub const MSG_AWAITING_AUTH: &str = "Aguarde a autenticação...";
pub const MSG_PERMISSION_DENIED: &str =
    "Erro de permissão. Verifique as regras de acesso da coleção.";
pub const MSG_CONNECTIVITY: &str = "Erro de conexão com o banco de dados.";

/// Error code recorded when the backend ends a live query without an error.
const STREAM_CLOSED: &str = "stream-closed";

/// Where the live query stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// No session yet (or the session was lost).
    Uninitialized,
    /// Live query open, no snapshot received yet.
    Subscribing,
    /// At least one snapshot applied.
    Synced,
    /// The live query reported an error or was closed by the backend.
    Failed(SubscriptionError),
}

/// Read-only view of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryState {
    pub phase: SyncPhase,
    pub loading: bool,
    /// Latest snapshot, newest first.
    pub items: Arc<[InventoryItem]>,
}

impl Default for InventoryState {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Uninitialized,
            loading: true,
            items: Arc::from(Vec::new()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no active session")]
    NoSession,
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Handle to the live inventory of one collection.
pub struct InventoryStore {
    client: Arc<dyn RemoteCollectionClient>,
    path: CollectionPath,
    session: watch::Receiver<Option<Session>>,
    notifications: NotificationQueue,
    state: watch::Receiver<InventoryState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryStore")
            .field("path", &self.path)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl InventoryStore {
    /// Spawn the driver and return the handle. Must be called within a Tokio
    /// runtime.
    pub fn start(
        client: Arc<dyn RemoteCollectionClient>,
        path: CollectionPath,
        session: watch::Receiver<Option<Session>>,
        notifications: NotificationQueue,
        config: &ClientConfig,
    ) -> Self {
        let (tx, state) = watch::channel(InventoryState::default());
        let shutdown = CancellationToken::new();

        let driver = Driver {
            client: client.clone(),
            query: CollectionQuery::newest_first(path.clone()),
            session: session.clone(),
            session_open: true,
            notifications: notifications.clone(),
            state: tx,
            auth_timeout: config.auth_timeout,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            client,
            path,
            session,
            notifications,
            state,
            shutdown,
            task: Some(task),
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    pub fn state(&self) -> InventoryState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Arc<[InventoryItem]> {
        self.state.borrow().items.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.borrow().phase.clone()
    }

    /// Observe every state change.
    pub fn watch(&self) -> watch::Receiver<InventoryState> {
        self.state.clone()
    }

    /// Items whose name or batch contains `query` (case-insensitive).
    pub fn filtered(&self, query: &str) -> Vec<InventoryItem> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|i| i.matches_filter(query))
            .cloned()
            .collect()
    }

    pub fn summary(&self, today: NaiveDate) -> InventorySummary {
        InventorySummary::from_items(&self.state.borrow().items, today)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Create a stock record. It shows up with the next snapshot.
    pub async fn add_item(&self, item: NewItem) -> Result<ItemId, StoreError> {
        let Some(session) = self.current_session() else {
            tracing::debug!("add_item ignored: no session");
            return Err(StoreError::NoSession);
        };

        let item = item.normalized();
        if let Err(err) = item.validate() {
            tracing::warn!(error = %err, "rejected new item");
            self.notifications.error(MSG_INVALID);
            return Err(err.into());
        }

        let result = match serde_json::to_value(item.into_fields(session.uid())) {
            Ok(fields) => self.client.insert_document(&self.path, fields).await,
            Err(e) => Err(WriteError::InvalidDocument(e.to_string())),
        };

        match result {
            Ok(id) => {
                tracing::info!(item_id = %id, path = %self.path, "item added");
                self.notifications.success(MSG_ADDED);
                Ok(id)
            }
            Err(err) => {
                tracing::error!(error = %err, path = %self.path, "failed to add item");
                self.notifications.error(MSG_ADD_FAILED);
                Err(err.into())
            }
        }
    }

    /// Delete a stock record by id. No local existence check is made; the
    /// record leaves the list with the next snapshot.
    pub async fn delete_item(&self, id: &ItemId) -> Result<(), StoreError> {
        if self.current_session().is_none() {
            tracing::debug!(item_id = %id, "delete_item ignored: no session");
            return Err(StoreError::NoSession);
        }

        match self.client.delete_document(&self.path, id).await {
            Ok(()) => {
                tracing::info!(item_id = %id, path = %self.path, "item deleted");
                self.notifications.success(MSG_DELETED);
                Ok(())
            }
            Err(err) => {
                tracing::error!(item_id = %id, error = %err, "failed to delete item");
                self.notifications.error(MSG_DELETE_FAILED);
                Err(err.into())
            }
        }
    }

    /// Insert the sample set in one atomic batch.
    pub async fn generate_sample_data(&self) -> Result<Vec<ItemId>, StoreError> {
        let Some(session) = self.current_session() else {
            self.notifications.info(MSG_AWAITING_AUTH);
            return Err(StoreError::NoSession);
        };

        let today = Utc::now().date_naive();
        let documents: Result<Vec<_>, _> = sample_items(today)
            .into_iter()
            .map(|item| serde_json::to_value(item.into_fields(session.uid())))
            .collect();

        let result = match documents {
            Ok(documents) => self.client.insert_batch(&self.path, documents).await,
            Err(e) => Err(WriteError::InvalidDocument(e.to_string())),
        };

        match result {
            Ok(ids) => {
                tracing::info!(count = ids.len(), path = %self.path, "sample data generated");
                self.notifications.success(MSG_SEEDED);
                Ok(ids)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to generate sample data");
                self.notifications.error(MSG_SEED_FAILED);
                Err(err.into())
            }
        }
    }

    /// Cancel the live query and wait for the driver to stop.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "inventory driver ended abnormally");
            }
        }
    }
}

impl Drop for InventoryStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum Exit {
    Shutdown,
    SessionChanged,
}

/// Sole writer of the published state.
struct Driver {
    client: Arc<dyn RemoteCollectionClient>,
    query: CollectionQuery,
    session: watch::Receiver<Option<Session>>,
    session_open: bool,
    notifications: NotificationQueue,
    state: watch::Sender<InventoryState>,
    auth_timeout: Duration,
    shutdown: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let fallback = tokio::time::sleep_until(Instant::now() + self.auth_timeout);
        tokio::pin!(fallback);
        let mut fallback_armed = true;

        loop {
            let current = self.session.borrow_and_update().clone();
            match current {
                None => {
                    self.reset();
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return,
                        _ = session_changed(&mut self.session, &mut self.session_open) => {}
                        _ = &mut fallback, if fallback_armed => {
                            fallback_armed = false;
                            if self.state.borrow().loading {
                                tracing::info!(
                                    timeout = ?self.auth_timeout,
                                    "no session yet; clearing loading flag"
                                );
                                self.state.send_modify(|s| s.loading = false);
                            }
                        }
                    }
                }
                Some(session) => match self.follow(session).await {
                    Exit::Shutdown => return,
                    Exit::SessionChanged => {}
                },
            }
        }
    }

    /// Keep one live query open until shutdown or a session change.
    async fn follow(&mut self, session: Session) -> Exit {
        self.state.send_modify(|s| {
            s.phase = SyncPhase::Subscribing;
            s.items = Arc::from(Vec::new());
        });

        let mut sub = self.client.subscribe_ordered(&self.query);
        let mut live = true;
        tracing::info!(path = %self.query.path, uid = %session.uid(), "inventory subscription opened");

        let exit = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break Exit::Shutdown,
                _ = session_changed(&mut self.session, &mut self.session_open) => break Exit::SessionChanged,
                event = sub.recv(), if live => match event {
                    Some(SnapshotEvent::Snapshot(docs)) => self.apply_snapshot(docs),
                    Some(SnapshotEvent::Error(err)) => {
                        self.fail(err);
                        live = false;
                    }
                    None => {
                        tracing::warn!(path = %self.query.path, "snapshot stream closed by the backend");
                        self.fail(SubscriptionError::Connectivity(STREAM_CLOSED.to_string()));
                        live = false;
                    }
                },
            }
        };

        sub.cancel();
        tracing::debug!(path = %self.query.path, "inventory subscription cancelled");
        exit
    }

    fn reset(&self) {
        self.state.send_if_modified(|s| {
            if s.phase == SyncPhase::Uninitialized && s.items.is_empty() {
                return false;
            }
            s.phase = SyncPhase::Uninitialized;
            s.items = Arc::from(Vec::new());
            true
        });
    }

    fn apply_snapshot(&self, docs: Vec<StoredDocument>) {
        let items: Vec<InventoryItem> = docs.iter().filter_map(decode_item).collect();
        if !has_unique_ids(&items) {
            tracing::warn!(path = %self.query.path, "snapshot contains duplicate ids");
        }
        tracing::debug!(count = items.len(), "snapshot applied");

        self.state.send_modify(|s| {
            s.phase = SyncPhase::Synced;
            s.loading = false;
            s.items = Arc::from(items);
        });
    }

    fn fail(&self, err: SubscriptionError) {
        tracing::error!(code = err.code(), path = %self.query.path, "inventory subscription failed");
        let message = if err.is_permission_denied() {
            MSG_PERMISSION_DENIED
        } else {
            MSG_CONNECTIVITY
        };
        self.state.send_modify(|s| {
            s.phase = SyncPhase::Failed(err);
            s.loading = false;
        });
        self.notifications.error(message);
    }
}

fn decode_item(doc: &StoredDocument) -> Option<InventoryItem> {
    match doc.decode::<ItemFields>() {
        Ok(fields) => Some(InventoryItem::from_parts(doc.id, doc.created_at, fields)),
        Err(e) => {
            tracing::warn!(item_id = %doc.id, error = %e, "skipping malformed document");
            None
        }
    }
}

/// Resolves on the next session transition; never resolves once the gate is gone.
async fn session_changed(rx: &mut watch::Receiver<Option<Session>>, open: &mut bool) {
    if *open && rx.changed().await.is_ok() {
        return;
    }
    *open = false;
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use proptest::prelude::*;
    use serde_json::{Value as JsonValue, json};
    use trackhub_backend::SubscriptionSender;
    use trackhub_backend::subscription;
    use trackhub_core::UserId;
    use trackhub_inventory::SAMPLE_SIZE;

    use super::*;

    /// Client double whose live queries are fed by the test.
    #[derive(Default)]
    struct ScriptedClient {
        feeds: Mutex<Vec<SubscriptionSender<SnapshotEvent>>>,
        writes: Mutex<Vec<&'static str>>,
        write_error: Option<WriteError>,
    }

    impl ScriptedClient {
        fn failing(err: WriteError) -> Self {
            Self {
                write_error: Some(err),
                ..Self::default()
            }
        }

        fn push(&self, event: SnapshotEvent) {
            let feeds = self.feeds.lock().unwrap();
            let feed = feeds.last().expect("no subscription opened");
            assert!(feed.send(event), "latest subscription was cancelled");
        }

        /// Drop every feed, as a backend does when it ends a live query.
        fn close_feeds(&self) {
            self.feeds.lock().unwrap().clear();
        }

        fn opened(&self) -> usize {
            self.feeds.lock().unwrap().len()
        }

        fn live(&self) -> usize {
            self.feeds.lock().unwrap().iter().filter(|f| !f.is_closed()).count()
        }

        fn writes(&self) -> Vec<&'static str> {
            self.writes.lock().unwrap().clone()
        }

        fn record(&self, op: &'static str) -> Result<(), WriteError> {
            self.writes.lock().unwrap().push(op);
            match &self.write_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RemoteCollectionClient for ScriptedClient {
        async fn create_anonymous_session(&self) -> Result<(), trackhub_backend::AuthError> {
            Ok(())
        }

        fn session_changes(&self) -> trackhub_backend::Subscription<Option<Session>> {
            subscription::channel().1
        }

        fn subscribe_ordered(&self, _query: &CollectionQuery) -> trackhub_backend::Subscription<SnapshotEvent> {
            let (tx, sub) = subscription::channel();
            self.feeds.lock().unwrap().push(tx);
            sub
        }

        async fn insert_document(&self, _path: &CollectionPath, _fields: JsonValue) -> Result<ItemId, WriteError> {
            self.record("insert").map(|_| ItemId::new())
        }

        async fn insert_batch(&self, _path: &CollectionPath, documents: Vec<JsonValue>) -> Result<Vec<ItemId>, WriteError> {
            self.record("batch").map(|_| documents.iter().map(|_| ItemId::new()).collect())
        }

        async fn delete_document(&self, _path: &CollectionPath, _id: &ItemId) -> Result<(), WriteError> {
            self.record("delete")
        }
    }

    fn path() -> CollectionPath {
        CollectionPath::parse("artifacts/default-app-id/public/data/trackhub_inventory")
    }

    fn session() -> Session {
        Session::anonymous(UserId::new(), Utc::now())
    }

    fn doc(name: &str, quantity: u32, created_at: DateTime<Utc>) -> StoredDocument {
        let fields = NewItem::new(name, quantity, 1.0).into_fields(UserId::new());
        StoredDocument {
            id: ItemId::new(),
            created_at,
            fields: serde_json::to_value(fields).unwrap(),
        }
    }

    fn newest_first(names: &[&str]) -> Vec<StoredDocument> {
        let base = Utc::now();
        names
            .iter()
            .enumerate()
            .map(|(i, n)| doc(n, 10, base - ChronoDuration::seconds(i as i64)))
            .collect()
    }

    fn names(state: &InventoryState) -> Vec<String> {
        state.items.iter().map(|i| i.name().to_string()).collect()
    }

    struct Harness {
        client: Arc<ScriptedClient>,
        session: watch::Sender<Option<Session>>,
        notifications: NotificationQueue,
        store: InventoryStore,
    }

    fn harness_with(client: ScriptedClient, initial: Option<Session>) -> Harness {
        harness_configured(client, initial, ClientConfig::default())
    }

    fn harness_configured(
        client: ScriptedClient,
        initial: Option<Session>,
        config: ClientConfig,
    ) -> Harness {
        let client = Arc::new(client);
        let (session, rx) = watch::channel(initial);
        let notifications = NotificationQueue::new(config.toast_duration);
        let store = InventoryStore::start(client.clone(), path(), rx, notifications.clone(), &config);
        assert_eq!(store.path(), &path());
        Harness {
            client,
            session,
            notifications,
            store,
        }
    }

    fn harness(initial: Option<Session>) -> Harness {
        harness_with(ScriptedClient::default(), initial)
    }

    async fn wait(store: &InventoryStore, f: impl FnMut(&InventoryState) -> bool) {
        store.watch().wait_for(f).await.expect("driver alive");
    }

    #[tokio::test(start_paused = true)]
    async fn loading_clears_after_auth_timeout_without_session() {
        let h = harness(None);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(h.store.loading());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = h.store.state();
        assert!(!state.loading);
        assert!(state.items.is_empty());
        assert_eq!(state.phase, SyncPhase::Uninitialized);
        assert_eq!(h.client.opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_timeout_is_configurable() {
        let config = ClientConfig::default().with_auth_timeout(Duration::from_millis(500));
        let h = harness_configured(ScriptedClient::default(), None, config);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(h.store.loading());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!h.store.loading());
        assert_eq!(h.store.phase(), SyncPhase::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn session_arriving_after_the_timeout_still_subscribes() {
        let h = harness(None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!h.store.loading());

        h.session.send_replace(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        assert_eq!(h.client.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_snapshot_syncs_and_clears_loading() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        assert!(h.store.loading());

        let amox = doc("Amoxicilina 500mg", 80, Utc::now());
        h.client.push(SnapshotEvent::Snapshot(vec![amox.clone()]));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;

        let state = h.store.state();
        assert!(!state.loading);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].item_id(), amox.id);
        assert_eq!(state.items[0].name(), "Amoxicilina 500mg");
        assert_eq!(state.items[0].quantity(), 80);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_omitting_items_drops_them() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        h.client.push(SnapshotEvent::Snapshot(newest_first(&["c", "b", "a"])));
        wait(&h.store, |s| s.items.len() == 3).await;

        h.client.push(SnapshotEvent::Snapshot(newest_first(&["d"])));
        wait(&h.store, |s| s.items.len() == 1).await;
        assert_eq!(names(&h.store.state()), vec!["d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_documents_are_skipped() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        let mut docs = newest_first(&["ok"]);
        docs.push(StoredDocument {
            id: ItemId::new(),
            created_at: Utc::now() - ChronoDuration::days(1),
            fields: json!({"name": 42}),
        });
        h.client.push(SnapshotEvent::Snapshot(docs));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;
        assert_eq!(names(&h.store.state()), vec!["ok"]);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_gets_its_own_message() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        h.client.push(SnapshotEvent::Error(SubscriptionError::from_code("permission-denied")));
        wait(&h.store, |s| matches!(s.phase, SyncPhase::Failed(_))).await;

        assert!(!h.store.loading());
        let toasts = h.notifications.visible();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, MSG_PERMISSION_DENIED);
        assert!(toasts[0].message.contains("permissão"));
        assert!(!toasts[0].message.contains("conexão"));
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_report_connectivity() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        h.client.push(SnapshotEvent::Error(SubscriptionError::from_code("unavailable")));
        wait(&h.store, |s| matches!(s.phase, SyncPhase::Failed(_))).await;
        assert_eq!(h.notifications.visible()[0].message, MSG_CONNECTIVITY);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_closed_before_first_snapshot_is_a_connectivity_failure() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        h.client.close_feeds();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = h.store.state();
        assert!(!state.loading);
        assert!(state.items.is_empty());
        assert_eq!(
            state.phase,
            SyncPhase::Failed(SubscriptionError::Connectivity("stream-closed".into()))
        );
        let toasts = h.notifications.visible();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, MSG_CONNECTIVITY);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_closed_after_sync_keeps_the_last_list() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        h.client.push(SnapshotEvent::Snapshot(newest_first(&["a", "b"])));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;

        h.client.close_feeds();
        wait(&h.store, |s| matches!(s.phase, SyncPhase::Failed(_))).await;
        assert_eq!(names(&h.store.state()), vec!["a", "b"]);
        assert_eq!(h.notifications.visible()[0].message, MSG_CONNECTIVITY);
    }

    #[tokio::test(start_paused = true)]
    async fn filtered_matches_name_and_batch_in_snapshot_order() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

        let base = Utc::now();
        let with_batch = |name: &str, batch: &str, age: i64| {
            let fields = NewItem::new(name, 10, 1.0)
                .with_batch(batch)
                .into_fields(UserId::new());
            StoredDocument {
                id: ItemId::new(),
                created_at: base - ChronoDuration::seconds(age),
                fields: serde_json::to_value(fields).unwrap(),
            }
        };
        h.client.push(SnapshotEvent::Snapshot(vec![
            with_batch("Dipirona Sódica", "D4421", 0),
            with_batch("Seringa 5ml", "S1029", 1),
            with_batch("Amoxicilina 500mg", "A9001", 2),
        ]));
        wait(&h.store, |s| s.items.len() == 3).await;

        let filtered_names = |query: &str| -> Vec<String> {
            h.store
                .filtered(query)
                .iter()
                .map(|i| i.name().to_string())
                .collect()
        };
        assert_eq!(filtered_names("seringa"), vec!["Seringa 5ml"]);
        assert_eq!(filtered_names("a9001"), vec!["Amoxicilina 500mg"]);
        assert_eq!(filtered_names("DIPI"), vec!["Dipirona Sódica"]);
        assert!(filtered_names("gaze").is_empty());
        assert_eq!(
            filtered_names(""),
            vec!["Dipirona Sódica", "Seringa 5ml", "Amoxicilina 500mg"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn session_change_replaces_the_subscription() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        h.client.push(SnapshotEvent::Snapshot(newest_first(&["old"])));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;
        assert_eq!(h.client.live(), 1);

        h.session.send_replace(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        assert!(h.store.items().is_empty());
        assert_eq!(h.client.opened(), 2);
        assert_eq!(h.client.live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_session_cancels_and_resets() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        h.client.push(SnapshotEvent::Snapshot(newest_first(&["x"])));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;

        h.session.send_replace(None);
        wait(&h.store, |s| s.phase == SyncPhase::Uninitialized).await;
        assert!(h.store.items().is_empty());
        assert_eq!(h.client.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_the_subscription() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        assert_eq!(h.client.live(), 1);

        h.store.shutdown().await;
        assert_eq!(h.client.live(), 0);
        assert_eq!(h.client.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn add_without_session_makes_no_call() {
        let h = harness(None);
        let before = h.store.state();

        let err = h.store.add_item(NewItem::new("Dipirona", 200, 0.6)).await.unwrap_err();
        assert!(matches!(err, StoreError::NoSession));
        assert!(h.client.writes().is_empty());
        assert!(h.notifications.visible().is_empty());
        assert_eq!(h.store.state(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_item_is_rejected_locally() {
        let h = harness(Some(session()));
        let err = h.store.add_item(NewItem::new("  ", 1, 1.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(h.client.writes().is_empty());
        assert_eq!(h.notifications.visible()[0].message, MSG_INVALID);
    }

    #[tokio::test(start_paused = true)]
    async fn add_does_not_touch_local_items() {
        let h = harness(Some(session()));
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        h.client.push(SnapshotEvent::Snapshot(Vec::new()));
        wait(&h.store, |s| s.phase == SyncPhase::Synced).await;

        h.store.add_item(NewItem::new("Dipirona", 200, 0.6)).await.unwrap();
        assert_eq!(h.client.writes(), vec!["insert"]);
        assert_eq!(h.notifications.visible()[0].message, MSG_ADDED);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.store.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_notifies_and_leaves_state() {
        let h = harness_with(
            ScriptedClient::failing(WriteError::PermissionDenied("rules".into())),
            Some(session()),
        );
        wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;
        let before = h.store.state();

        let err = h.store.add_item(NewItem::new("Gaze", 10, 0.1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(h.notifications.visible()[0].message, MSG_ADD_FAILED);

        let err = h.store.delete_item(&ItemId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(h.notifications.visible()[1].message, MSG_DELETE_FAILED);
        assert_eq!(h.store.state(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_sends_request_without_existence_check() {
        let h = harness(Some(session()));
        h.store.delete_item(&ItemId::new()).await.unwrap();
        assert_eq!(h.client.writes(), vec!["delete"]);
        assert_eq!(h.notifications.visible()[0].message, MSG_DELETED);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_data_is_one_batch() {
        let h = harness(Some(session()));
        let ids = h.store.generate_sample_data().await.unwrap();
        assert_eq!(ids.len(), SAMPLE_SIZE);
        assert_eq!(h.client.writes(), vec!["batch"]);
        assert_eq!(h.notifications.visible()[0].message, MSG_SEEDED);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_data_without_session_asks_to_wait() {
        let h = harness(None);
        let err = h.store.generate_sample_data().await.unwrap_err();
        assert!(matches!(err, StoreError::NoSession));
        assert!(h.client.writes().is_empty());
        assert_eq!(h.notifications.visible()[0].message, MSG_AWAITING_AUTH);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: after each delivery the list is exactly that delivery,
        /// in the order the source provided.
        #[test]
        fn each_snapshot_replaces_the_list(
            deliveries in prop::collection::vec(
                prop::collection::vec(("[a-z]{1,8}", 0u32..500), 0..6),
                1..6
            )
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let h = harness(Some(session()));
                wait(&h.store, |s| s.phase == SyncPhase::Subscribing).await;

                for (round, delivery) in deliveries.iter().enumerate() {
                    let base = Utc::now();
                    let docs: Vec<StoredDocument> = delivery
                        .iter()
                        .enumerate()
                        .map(|(i, (name, qty))| doc(name, *qty, base - ChronoDuration::seconds(i as i64)))
                        .collect();
                    let expected: Vec<ItemId> = docs.iter().map(|d| d.id).collect();

                    h.client.push(SnapshotEvent::Snapshot(docs));
                    wait(&h.store, |s| {
                        s.phase == SyncPhase::Synced
                            && s.items.iter().map(|i| i.item_id()).eq(expected.iter().copied())
                    })
                    .await;

                    let state = h.store.state();
                    assert!(!state.loading, "round {round}");
                    assert!(has_unique_ids(&state.items));
                    assert!(state.items.windows(2).all(|w| w[0].created_at() >= w[1].created_at()));
                }
            });
        }
    }
}
