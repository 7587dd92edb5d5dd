//! Anonymous session bootstrap.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use trackhub_backend::{AuthError, RemoteCollectionClient, Session};

use crate::config::ClientConfig;
use crate::notifications::NotificationQueue;

pub const MSG_AUTH_FAILED: &str =
    "Falha na autenticação. Verifique se o login anônimo está habilitado.";

/// Owns the one sign-in attempt of a run and mirrors the ambient session.
///
/// The exposed value follows the backend's session stream, not the outcome of
/// the sign-in call: it turns present when the backend confirms a session and
/// stays absent when sign-in fails. A failed sign-in is logged and never
/// retried; "no session" is a valid state for the rest of the run.
#[derive(Debug)]
pub struct SessionGate {
    session: watch::Receiver<Option<Session>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionGate {
    /// Start listening and issue the sign-in request. Must be called within a
    /// Tokio runtime.
    pub fn start(
        client: Arc<dyn RemoteCollectionClient>,
        notifications: NotificationQueue,
        config: &ClientConfig,
    ) -> Self {
        let (tx, session) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let notify_failure = config.notify_auth_failure;

        let task = tokio::spawn(run(
            client,
            tx,
            notifications,
            notify_failure,
            shutdown.clone(),
        ));

        Self {
            session,
            shutdown,
            task: Some(task),
        }
    }

    /// The session as of now.
    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Read-only view that updates on every session transition.
    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.session.clone()
    }

    /// Stop following session changes and wait for the listener to detach.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "session listener ended abnormally");
            }
        }
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(
    client: Arc<dyn RemoteCollectionClient>,
    tx: watch::Sender<Option<Session>>,
    notifications: NotificationQueue,
    notify_failure: bool,
    shutdown: CancellationToken,
) {
    // Listen before signing in so the confirmation cannot be missed.
    let mut changes = client.session_changes();
    let mut sign_in = client.create_anonymous_session();
    let mut signing_in = true;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = &mut sign_in, if signing_in => {
                signing_in = false;
                report_sign_in(result, &notifications, notify_failure);
            }
            change = changes.recv() => match change {
                Some(session) => {
                    tx.send_if_modified(|current| {
                        if *current == session {
                            return false;
                        }
                        match &session {
                            Some(s) => tracing::info!(uid = %s.uid(), anonymous = s.is_anonymous(), "session established"),
                            None => tracing::info!("session cleared"),
                        }
                        *current = session;
                        true
                    });
                }
                None => {
                    tracing::warn!("session stream closed by the backend");
                    // Still settle the one sign-in attempt of this run.
                    if signing_in {
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            result = &mut sign_in => report_sign_in(result, &notifications, notify_failure),
                        }
                    }
                    break;
                }
            },
        }
    }

    changes.cancel();
}

fn report_sign_in(
    result: Result<(), AuthError>,
    notifications: &NotificationQueue,
    notify_failure: bool,
) {
    match result {
        Ok(()) => tracing::debug!("anonymous sign-in requested"),
        Err(err) => {
            tracing::error!(error = %err, "anonymous sign-in failed; continuing without a session");
            if notify_failure {
                notifications.error(MSG_AUTH_FAILED);
            }
        }
    }
}
