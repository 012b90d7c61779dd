//! Device registry: which data device represents a connection.
//!
//! Drag focus and keyboard focus are tracked per surface; events go to
//! the data device the surface's connection bound. A connection may bind
//! more than one device; the most recently bound one answers lookups.

use std::collections::HashMap;

use super::{ClientId, ObjectId};

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<ClientId, Vec<ObjectId>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly bound device for its connection.
    pub fn insert(&mut self, device: ObjectId) {
        self.devices.entry(device.client).or_default().push(device);
    }

    /// Forget a device. Idempotent.
    pub fn remove(&mut self, device: ObjectId) {
        if let Some(list) = self.devices.get_mut(&device.client) {
            list.retain(|d| *d != device);
            if list.is_empty() {
                self.devices.remove(&device.client);
            }
        }
    }

    /// The device that represents `client`, if it bound one.
    pub fn find(&self, client: ClientId) -> Option<ObjectId> {
        self.devices.get(&client).and_then(|list| list.last().copied())
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }
}
