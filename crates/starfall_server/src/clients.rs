//! Connected clients and their outbound queues.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

use crate::config::CLIENT_CHANNEL_CAPACITY;
use crate::protocol::ServerMessage;

/// Identifies one WebSocket connection for its lifetime.
///
/// A client id can be reused by a later connection; the connection id
/// cannot.
pub type ConnectionId = u64;

type Outbound = mpsc::Sender<Utf8Bytes>;

#[derive(Debug)]
struct Entry {
    connection: ConnectionId,
    tx: Outbound,
}

#[derive(Debug, Default)]
struct Registry {
    clients: BTreeMap<String, Entry>,
    last_connection: ConnectionId,
}

/// A registered connection.
#[derive(Debug)]
pub struct Registration {
    /// Id of this connection.
    pub connection: ConnectionId,
    /// Messages queued for this connection.
    pub outbound: mpsc::Receiver<Utf8Bytes>,
}

/// Registry of open connections keyed by client id.
///
/// Delivery never blocks: a client whose queue is full or closed misses
/// the message.
#[derive(Debug, Default)]
pub struct ClientManager {
    registry: Mutex<Registry>,
}

impl ClientManager {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection under `client_id`.
    ///
    /// Returns `None` while another connection with that id is still
    /// reading its queue. A closed entry is replaced.
    pub fn register(&self, client_id: &str) -> Option<Registration> {
        let mut registry = self.lock();
        if registry
            .clients
            .get(client_id)
            .is_some_and(|entry| !entry.tx.is_closed())
        {
            return None;
        }
        registry.last_connection += 1;
        let connection = registry.last_connection;
        let (tx, outbound) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        registry
            .clients
            .insert(client_id.to_owned(), Entry { connection, tx });
        Some(Registration {
            connection,
            outbound,
        })
    }

    /// Forget `client_id` if it still belongs to `connection`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, client_id: &str, connection: ConnectionId) -> bool {
        let mut registry = self.lock();
        match registry.clients.get(client_id) {
            Some(entry) if entry.connection == connection => {
                registry.clients.remove(client_id);
                true
            }
            Some(_) => {
                tracing::debug!(client_id, connection, "Client id taken over, keeping newer entry");
                false
            }
            None => false,
        }
    }

    /// Whether a client id is registered.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        self.lock().clients.contains_key(client_id)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().clients.len()
    }

    /// Whether no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().clients.is_empty()
    }

    /// Queue a message for one client. Returns whether it was queued.
    pub fn send_to(&self, client_id: &str, message: &ServerMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };
        self.send_text(client_id, text)
    }

    /// Queue pre-encoded text for one client.
    pub fn send_text(&self, client_id: &str, text: Utf8Bytes) -> bool {
        let registry = self.lock();
        let Some(entry) = registry.clients.get(client_id) else {
            tracing::debug!(client_id, "Send to unknown client");
            return false;
        };
        deliver(client_id, &entry.tx, text)
    }

    /// Queue a message for every client. Returns how many accepted it.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };
        self.broadcast_text(&text)
    }

    /// Queue pre-encoded text for every client.
    pub fn broadcast_text(&self, text: &Utf8Bytes) -> usize {
        self.lock()
            .clients
            .iter()
            .filter(|(client_id, entry)| deliver(client_id, &entry.tx, text.clone()))
            .count()
    }
}

/// Serialize a message once for any number of clients.
#[must_use]
pub fn encode(message: &ServerMessage) -> Option<Utf8Bytes> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server message");
            None
        }
    }
}

fn deliver(client_id: &str, tx: &Outbound, text: Utf8Bytes) -> bool {
    match tx.try_send(text) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!(client_id, "Client queue full, dropping message");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_live_duplicate() {
        let clients = ClientManager::new();
        let first = clients.register("alpha");
        assert!(first.is_some());
        assert!(clients.register("alpha").is_none());

        // A dropped receiver frees the id.
        drop(first);
        assert!(clients.register("alpha").is_some());
    }

    #[test]
    fn test_stale_cleanup_keeps_newer_connection() {
        let clients = ClientManager::new();
        let old = clients.register("alice").unwrap();
        let old_connection = old.connection;
        drop(old.outbound);

        let mut new = clients.register("alice").unwrap();
        assert_ne!(new.connection, old_connection);

        // The first connection cleans up after the second one took the id.
        assert!(!clients.remove("alice", old_connection));
        assert!(clients.contains("alice"));
        assert!(clients.send_to("alice", &ServerMessage::error("still here")));
        assert!(new.outbound.try_recv().is_ok());

        assert!(clients.remove("alice", new.connection));
        assert!(!clients.contains("alice"));
    }

    #[test]
    fn test_send_to_reaches_only_target() {
        let clients = ClientManager::new();
        let mut a = clients.register("a").unwrap().outbound;
        let mut b = clients.register("b").unwrap().outbound;

        assert!(clients.send_to("a", &ServerMessage::error("hi")));
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
        assert!(!clients.send_to("nobody", &ServerMessage::error("hi")));
    }

    #[test]
    fn test_broadcast_skips_closed_and_full() {
        let clients = ClientManager::new();
        let mut open = clients.register("open").unwrap().outbound;
        let closed = clients.register("closed").unwrap();
        let closed_connection = closed.connection;
        drop(closed);
        let _full = clients.register("full").unwrap();
        let filler = Utf8Bytes::from_static("x");
        for _ in 0..CLIENT_CHANNEL_CAPACITY {
            assert!(clients.send_text("full", filler.clone()));
        }

        assert_eq!(clients.broadcast(&ServerMessage::error("tick")), 1);
        assert!(open.try_recv().is_ok());
        assert_eq!(clients.len(), 3);

        assert!(clients.remove("closed", closed_connection));
        assert!(!clients.contains("closed"));
    }
}
