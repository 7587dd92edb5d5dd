//! Wiring for one dashboard run.

use std::sync::Arc;

use trackhub_backend::RemoteCollectionClient;

use crate::config::AppConfig;
use crate::notifications::NotificationQueue;
use crate::session::SessionGate;
use crate::store::InventoryStore;

/// The live core of one run: notifications, the session gate and the store,
/// all sharing one backend client.
#[derive(Debug)]
pub struct AppContext {
    notifications: NotificationQueue,
    session: SessionGate,
    inventory: InventoryStore,
}

impl AppContext {
    /// Start the session gate and the inventory store. Must be called within a
    /// Tokio runtime.
    pub fn start(config: &AppConfig, client: Arc<dyn RemoteCollectionClient>) -> Self {
        let notifications = NotificationQueue::new(config.client.toast_duration);
        let session = SessionGate::start(client.clone(), notifications.clone(), &config.client);
        let path = config.backend.collection_path();
        tracing::info!(%path, project_id = %config.backend.project_id, "starting inventory core");

        let inventory = InventoryStore::start(
            client,
            path,
            session.watch(),
            notifications.clone(),
            &config.client,
        );

        Self {
            notifications,
            session,
            inventory,
        }
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    /// Tear down in dependency order: the store's live query first, then the
    /// session listener.
    pub async fn shutdown(self) {
        self.inventory.shutdown().await;
        self.session.shutdown().await;
        tracing::info!("inventory core stopped");
    }
}
