//! Push-stream subscription with an explicit cancellation handle.
//!
//! Every live stream the backend offers (session changes, ordered collection
//! snapshots) is handed out as a [`Subscription`]. The consumer owns it; the
//! producer keeps the paired [`SubscriptionSender`] and stops delivering as
//! soon as the subscription is cancelled or dropped.
//!
//! ## Usage Pattern
//!
//! ```ignore
//! let mut sub = client.subscribe_ordered(&query);
//!
//! loop {
//!     tokio::select! {
//!         _ = shutdown.cancelled() => break,
//!         event = sub.recv() => match event {
//!             Some(event) => handle(event),
//!             None => break, // producer went away
//!         },
//!     }
//! }
//!
//! sub.cancel();
//! ```
//!
//! ## Cancellation
//!
//! `cancel` consumes the subscription, so a given stream is cancelled at most
//! once by its owner. Dropping an uncancelled subscription cancels it as well,
//! which ties the listener's lifetime to the owning scope.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Consumer half of a live stream.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: mpsc::UnboundedReceiver<M>,
    cancel: CancellationToken,
}

/// Producer half of a live stream.
#[derive(Debug)]
pub struct SubscriptionSender<M> {
    sender: mpsc::UnboundedSender<M>,
    cancel: CancellationToken,
}

/// Create a connected sender/subscription pair.
pub fn channel<M>() -> (SubscriptionSender<M>, Subscription<M>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    (
        SubscriptionSender {
            sender,
            cancel: cancel.clone(),
        },
        Subscription { receiver, cancel },
    )
}

impl<M> Subscription<M> {
    /// Wait for the next message. `None` once the producer has gone away.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Stop the stream. The producer drops its sender on the next delivery attempt.
    pub fn cancel(self) {
        self.cancel.cancel();
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<M> SubscriptionSender<M> {
    /// Deliver a message. Returns `false` when the consumer is gone, in which
    /// case the sender should be discarded.
    pub fn send(&self, message: M) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(message).is_ok()
    }

    /// `true` once the consumer cancelled or dropped its subscription.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (tx, mut sub) = channel();
        assert!(tx.send(1));
        assert!(tx.send(2));
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn cancel_closes_the_sender() {
        let (tx, sub) = channel::<u32>();
        assert!(!tx.is_closed());
        sub.cancel();
        assert!(tx.is_closed());
        assert!(!tx.send(7));
    }

    #[tokio::test]
    async fn drop_cancels() {
        let (tx, sub) = channel::<u32>();
        drop(sub);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn recv_ends_when_producer_is_dropped() {
        let (tx, mut sub) = channel::<u32>();
        drop(tx);
        assert_eq!(sub.recv().await, None);
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
