//! Order status relay.
//!
//! Registry of open WebSocket connections. Each connection may watch one
//! order; a later subscription replaces the earlier one. Broadcasts are
//! delivered only to current watchers of that order and are never queued
//! for later subscribers.
//!
//! ```text
//! OrderService::change_status (after commit)
//!       │ broadcast(order_id, status)
//!       ▼
//! OrderRelay
//!   └── connections: ConnectionId → (subscription, Sender<ServerMessage>)
//!             │ try_send
//!             ▼
//!        /ws session task → socket
//! ```

pub mod protocol;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;

use techmart_core::{OrderId, OrderStatus};

pub use protocol::{ClientMessage, ServerMessage};

/// Outbound buffer per connection. A full buffer drops the update.
pub const CONNECTION_BUFFER: usize = 32;

/// Identifies one open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Connection {
    subscription: Option<OrderId>,
    tx: mpsc::Sender<ServerMessage>,
}

/// Shared registry of live connections.
#[derive(Clone, Default)]
pub struct OrderRelay {
    connections: Arc<DashMap<ConnectionId, Connection>>,
    next_id: Arc<AtomicU64>,
}

impl OrderRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with no subscription. Updates for it arrive on the
    /// returned receiver.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
        self.connections.insert(
            id,
            Connection {
                subscription: None,
                tx,
            },
        );
        (id, rx)
    }

    /// Point a connection at `order_id`, replacing any previous subscription.
    /// Returns `false` if the connection is gone.
    pub fn subscribe(&self, id: ConnectionId, order_id: OrderId) -> bool {
        self.connections
            .get_mut(&id)
            .map(|mut conn| conn.subscription = Some(order_id))
            .is_some()
    }

    pub fn remove(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Current subscription of a connection.
    #[must_use]
    pub fn subscription(&self, id: ConnectionId) -> Option<OrderId> {
        self.connections.get(&id).and_then(|conn| conn.subscription)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Push a status change to every watcher of `order_id`. Returns how many
    /// connections accepted the message.
    pub fn broadcast(&self, order_id: OrderId, new_status: OrderStatus) -> usize {
        let message = ServerMessage::OrderUpdate {
            order_id,
            new_status,
            timestamp: Utc::now(),
        };

        let mut delivered = 0;
        for conn in self.connections.iter() {
            if conn.subscription != Some(order_id) {
                continue;
            }
            match conn.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(connection = %conn.key(), order_id = %order_id, error = %e, "Order update dropped");
                }
            }
        }

        tracing::debug!(order_id = %order_id, status = %new_status, delivered, "Order update broadcast");
        delivered
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(id: i32) -> OrderId {
        OrderId::new(id)
    }

    #[tokio::test]
    async fn test_only_subscribers_of_order_receive() {
        let relay = OrderRelay::new();
        let (a, mut rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        let (_c, mut rx_c) = relay.register();
        relay.subscribe(a, order(1));
        relay.subscribe(b, order(2));

        assert_eq!(relay.broadcast(order(1), OrderStatus::Shipped), 1);

        let ServerMessage::OrderUpdate {
            order_id,
            new_status,
            ..
        } = rx_a.recv().await.unwrap();
        assert_eq!(order_id, order(1));
        assert_eq!(new_status, OrderStatus::Shipped);
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_last_subscription_wins() {
        let relay = OrderRelay::new();
        let (a, mut rx) = relay.register();
        relay.subscribe(a, order(1));
        relay.subscribe(a, order(2));
        assert_eq!(relay.subscription(a), Some(order(2)));

        assert_eq!(relay.broadcast(order(1), OrderStatus::Processing), 0);
        assert_eq!(relay.broadcast(order(2), OrderStatus::Processing), 1);
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_late_subscriber_gets_nothing() {
        let relay = OrderRelay::new();
        assert_eq!(relay.broadcast(order(5), OrderStatus::Cancelled), 0);

        let (a, mut rx) = relay.register();
        relay.subscribe(a, order(5));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_remove_drops_connection() {
        let relay = OrderRelay::new();
        let (a, _rx) = relay.register();
        relay.subscribe(a, order(3));
        assert_eq!(relay.connection_count(), 1);

        relay.remove(a);
        assert_eq!(relay.connection_count(), 0);
        assert!(!relay.subscribe(a, order(4)));
        assert_eq!(relay.broadcast(order(3), OrderStatus::Shipped), 0);
    }

    #[test]
    fn test_full_buffer_drops_update() {
        let relay = OrderRelay::new();
        let (a, _rx) = relay.register();
        relay.subscribe(a, order(9));
        for _ in 0..CONNECTION_BUFFER {
            assert_eq!(relay.broadcast(order(9), OrderStatus::Processing), 1);
        }
        assert_eq!(relay.broadcast(order(9), OrderStatus::Shipped), 0);
    }
}
