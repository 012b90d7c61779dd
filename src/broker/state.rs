//! Broker state: the seat plus the connection table.
//!
//! All methods are pure state transitions with no I/O. Outgoing traffic
//! is collected by the caller's [`EventSink`].

use std::collections::HashMap;
use std::path::PathBuf;

use crate::ipc::protocol::Role;
use crate::seat::{ClientId, EventSink, Seat, SeatConfig};

/// Broker configuration, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Explicit socket path. `None` means `$XDG_RUNTIME_DIR/selectd/broker.sock`.
    pub socket_path: Option<PathBuf>,
    /// MIME types one data source may advertise.
    pub max_mime_types: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            max_mime_types: SeatConfig::default().max_mime_types,
        }
    }
}

impl BrokerConfig {
    pub fn seat_config(&self) -> SeatConfig {
        SeatConfig {
            max_mime_types: self.max_mime_types,
        }
    }
}

/// Owned exclusively by the broker loop. No concurrent access.
#[derive(Debug)]
pub struct BrokerState {
    seat: Seat,
    /// Connections that completed the handshake.
    connections: HashMap<ClientId, Role>,
}

impl BrokerState {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            seat: Seat::new(config.seat_config()),
            connections: HashMap::new(),
        }
    }

    pub fn seat(&self) -> &Seat {
        &self.seat
    }

    pub fn seat_mut(&mut self) -> &mut Seat {
        &mut self.seat
    }

    /// Record a connection that completed the handshake.
    ///
    /// Returns `false` if the connection had already done so.
    pub fn add_connection(&mut self, id: ClientId, role: Role) -> bool {
        if self.connections.contains_key(&id) {
            return false;
        }
        self.connections.insert(id, role);
        true
    }

    pub fn connection_role(&self, id: ClientId) -> Option<Role> {
        self.connections.get(&id).copied()
    }

    /// Forget a connection and destroy every object it owned.
    ///
    /// Idempotent. Peers are notified through `sink` as if each object
    /// had been destroyed by request.
    pub fn remove_connection(&mut self, id: ClientId, sink: &mut dyn EventSink) {
        self.connections.remove(&id);
        self.seat.remove_client(id, sink);
    }

    /// Seat-role connections, which receive observer notifications.
    pub fn observers(&self) -> Vec<ClientId> {
        let mut observers: Vec<ClientId> = self
            .connections
            .iter()
            .filter(|(_, role)| **role == Role::Seat)
            .map(|(id, _)| *id)
            .collect();
        observers.sort();
        observers
    }
}
