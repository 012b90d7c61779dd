//! Selection and drag-and-drop state for one input device.
//!
//! The seat owns every protocol object the broker's connections create
//! (surfaces, data sources, data offers, data devices) in one map keyed
//! by `(connection, object id)`. Cross-object references are
//! [`signal::Link`]s; destroying an object fires its signal and the seat
//! clears every link that pointed at it before the handler returns.
//!
//! All methods are pure state transitions. Outgoing traffic goes
//! through an [`EventSink`] supplied by the caller, so the same code
//! runs under the broker loop and under unit tests.

mod drag;
mod error;
mod event;
mod input;
mod offer;
pub mod registry;
mod selection;
pub mod signal;
mod source;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};

pub use error::RequestError;
pub use event::{Destination, Event, EventSink};
pub use input::ButtonState;

use drag::DragSession;
use input::{KeyboardState, PointerState};
use offer::DataOffer;
use registry::DeviceRegistry;
use selection::SelectionState;
use signal::{Link, Signal};
use source::DataSource;

/// First object id of the range the server allocates from.
///
/// Ids below it belong to the connection; offers are created by the
/// seat and numbered from here up.
pub const SERVER_ID_BASE: u32 = 0xff00_0000;

/// Identity of one client connection.
///
/// Monotonically increasing counter, shared by every seat in the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An object as seen by the connection that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub client: ClientId,
    pub id: u32,
}

impl ObjectId {
    pub fn new(client: ClientId, id: u32) -> Self {
        Self { client, id }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.client, self.id)
    }
}

/// Seat tunables.
#[derive(Debug, Clone)]
pub struct SeatConfig {
    /// MIME types a single data source may advertise before `offer`
    /// reports `no_memory`.
    pub max_mime_types: usize,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            max_mime_types: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Surface,
    DataSource,
    DataOffer,
    DataDevice,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Surface => "surface",
            Kind::DataSource => "data source",
            Kind::DataOffer => "data offer",
            Kind::DataDevice => "data device",
        }
    }
}

#[derive(Debug)]
enum ObjectKind {
    Surface,
    DataSource(DataSource),
    DataOffer(DataOffer),
    DataDevice,
}

impl ObjectKind {
    fn kind(&self) -> Kind {
        match self {
            ObjectKind::Surface => Kind::Surface,
            ObjectKind::DataSource(_) => Kind::DataSource,
            ObjectKind::DataOffer(_) => Kind::DataOffer,
            ObjectKind::DataDevice => Kind::DataDevice,
        }
    }
}

/// What a fired destruction listener means to the seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listener {
    /// The offer's source went away.
    OfferSource(ObjectId),
    /// The offer's target device went away; the offer goes with it.
    OfferTarget(ObjectId),
    DragSource,
    DragIcon,
    DragFocus,
    SelectionSource,
    KeyboardFocus,
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    destroy_signal: Signal<Listener>,
}

/// The input-device context every request handler runs against.
#[derive(Debug)]
pub struct Seat {
    config: SeatConfig,
    objects: HashMap<ObjectId, Object>,
    devices: DeviceRegistry,
    next_server_id: HashMap<ClientId, u32>,
    server_ids: RangeInclusive<u32>,
    serial: u32,
    pointer: PointerState,
    keyboard: KeyboardState,
    drag: Option<DragSession>,
    selection: SelectionState,
}

impl Seat {
    pub fn new(config: SeatConfig) -> Self {
        Self {
            config,
            objects: HashMap::new(),
            devices: DeviceRegistry::new(),
            next_server_id: HashMap::new(),
            server_ids: SERVER_ID_BASE..=u32::MAX,
            serial: 0,
            pointer: PointerState::default(),
            keyboard: KeyboardState::default(),
            drag: None,
            selection: SelectionState::default(),
        }
    }

    /// Draw the next display serial.
    pub fn next_serial(&mut self) -> u32 {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    // -- Manager requests --

    pub fn create_surface(&mut self, id: ObjectId) -> Result<(), RequestError> {
        self.insert_object(id, ObjectKind::Surface)
    }

    pub fn destroy_surface(
        &mut self,
        id: ObjectId,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        self.require(id, Kind::Surface)?;
        self.destroy_object(id, sink);
        Ok(())
    }

    /// Bind a data device for the connection owning `id`.
    pub fn get_data_device(&mut self, id: ObjectId) -> Result<(), RequestError> {
        self.insert_object(id, ObjectKind::DataDevice)?;
        self.devices.insert(id);
        tracing::debug!(device = %id, "data device bound");
        Ok(())
    }

    /// Unbind a data device. Offers delivered through it die with it.
    pub fn release_device(
        &mut self,
        id: ObjectId,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        self.require(id, Kind::DataDevice)?;
        self.destroy_object(id, sink);
        Ok(())
    }

    /// Tear down everything a connection owned.
    ///
    /// Objects are destroyed in id order; listeners on other connections'
    /// objects run as usual, so surviving peers see `leave`, `selection`
    /// and friends exactly as if each object had been destroyed by request.
    pub fn remove_client(&mut self, client: ClientId, sink: &mut dyn EventSink) {
        let mut owned: Vec<ObjectId> = self
            .objects
            .keys()
            .filter(|id| id.client == client)
            .copied()
            .collect();
        owned.sort();
        for id in owned {
            self.destroy_object(id, sink);
        }
        self.next_server_id.remove(&client);
        tracing::debug!(%client, "client objects released");
    }

    // -- Introspection --

    #[cfg(test)]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn selection_source(&self) -> Option<ObjectId> {
        self.selection.source.map(|l| l.target())
    }

    // -- Object table --

    fn insert_object(&mut self, id: ObjectId, kind: ObjectKind) -> Result<(), RequestError> {
        if id.id == 0 || id.id >= SERVER_ID_BASE {
            return Err(RequestError::InvalidId(id));
        }
        if self.objects.contains_key(&id) {
            return Err(RequestError::IdInUse(id));
        }
        self.objects.insert(
            id,
            Object {
                kind,
                destroy_signal: Signal::new(),
            },
        );
        Ok(())
    }

    fn require(&self, id: ObjectId, kind: Kind) -> Result<(), RequestError> {
        match self.objects.get(&id) {
            Some(object) if object.kind.kind() == kind => Ok(()),
            Some(_) => Err(RequestError::WrongKind {
                id,
                expected: kind.name(),
            }),
            None => Err(RequestError::NoSuchObject(id)),
        }
    }

    fn is_surface(&self, id: ObjectId) -> bool {
        self.require(id, Kind::Surface).is_ok()
    }

    /// Next free id in `client`'s server range.
    ///
    /// Wraps to the start of the range once the end is reached, so ids
    /// of destroyed offers come back. `None` only when every id is live.
    fn allocate_server_id(&mut self, client: ClientId) -> Option<ObjectId> {
        let (first, last) = (*self.server_ids.start(), *self.server_ids.end());
        let next = self.next_server_id.entry(client).or_insert(first);
        let start = *next;
        loop {
            let candidate = ObjectId::new(client, *next);
            *next = if *next >= last { first } else { *next + 1 };
            if !self.objects.contains_key(&candidate) {
                return Some(candidate);
            }
            if *next == start {
                return None;
            }
        }
    }

    /// Register `listener` on `target`'s destruction signal.
    ///
    /// Returns `None` if `target` does not exist.
    fn link(&mut self, target: ObjectId, listener: Listener) -> Option<Link<ObjectId>> {
        let object = self.objects.get_mut(&target)?;
        let token = object.destroy_signal.add(listener);
        Some(Link::new(target, token))
    }

    /// Drop a weak reference early. A no-op if the target is already gone.
    fn unlink(&mut self, link: Link<ObjectId>) {
        if let Some(object) = self.objects.get_mut(&link.target()) {
            object.destroy_signal.remove(link.token());
        }
    }

    /// Remove an object and run its destruction listeners.
    ///
    /// Destroying an id that is not present does nothing, so every
    /// destruction path may race every other one.
    fn destroy_object(&mut self, id: ObjectId, sink: &mut dyn EventSink) {
        let Some(object) = self.objects.remove(&id) else {
            return;
        };
        tracing::debug!(
            object = %id,
            kind = object.kind.kind().name(),
            listeners = object.destroy_signal.len(),
            "object destroyed"
        );

        match object.kind {
            ObjectKind::DataOffer(offer) => {
                if let Some(source) = offer.source {
                    self.unlink(source);
                }
                self.unlink(offer.target);
            }
            ObjectKind::DataDevice => self.devices.remove(id),
            ObjectKind::Surface => {
                if self.pointer.focus == Some(id) {
                    self.pointer.focus = None;
                }
                self.drag_surface_destroyed(id, sink);
            }
            ObjectKind::DataSource(_) => {}
        }

        for listener in object.destroy_signal.emit() {
            self.notify(id, listener, sink);
        }
    }

    fn notify(&mut self, destroyed: ObjectId, listener: Listener, sink: &mut dyn EventSink) {
        tracing::trace!(object = %destroyed, ?listener, "destroy listener fired");
        match listener {
            Listener::OfferSource(offer) => {
                if let Some(Object {
                    kind: ObjectKind::DataOffer(data),
                    ..
                }) = self.objects.get_mut(&offer)
                {
                    data.source = None;
                }
            }
            Listener::OfferTarget(offer) => self.destroy_object(offer, sink),
            Listener::DragSource => {
                if let Some(drag) = self.drag.as_mut() {
                    drag.source = None;
                }
                self.end_drag(sink);
            }
            Listener::DragIcon => {
                if let Some(drag) = self.drag.as_mut() {
                    drag.icon = None;
                }
            }
            Listener::DragFocus => {
                if let Some(drag) = self.drag.as_mut() {
                    drag.focus = None;
                }
            }
            Listener::SelectionSource => self.selection_source_destroyed(sink),
            Listener::KeyboardFocus => self.keyboard.focus = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn client_range_enforced() {
        let mut seat = seat();
        let c = ClientId::new();
        assert_eq!(
            seat.create_surface(ObjectId::new(c, 0)),
            Err(RequestError::InvalidId(ObjectId::new(c, 0)))
        );
        assert_eq!(
            seat.create_surface(ObjectId::new(c, SERVER_ID_BASE)),
            Err(RequestError::InvalidId(ObjectId::new(c, SERVER_ID_BASE)))
        );
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut seat = seat();
        let c = ClientId::new();
        seat.create_surface(ObjectId::new(c, 1)).unwrap();
        let err = seat.get_data_device(ObjectId::new(c, 1)).unwrap_err();
        assert_eq!(err.reason(), "id_in_use");
    }

    #[test]
    fn same_id_in_two_clients_is_fine() {
        let mut seat = seat();
        seat.create_surface(ObjectId::new(ClientId::new(), 1)).unwrap();
        seat.create_surface(ObjectId::new(ClientId::new(), 1)).unwrap();
        assert_eq!(seat.object_count(), 2);
    }

    #[test]
    fn wrong_kind_reported() {
        let mut seat = seat();
        let mut sink = RecordingSink::default();
        let c = ClientId::new();
        seat.create_surface(ObjectId::new(c, 1)).unwrap();
        let err = seat
            .release_device(ObjectId::new(c, 1), &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::WrongKind {
                id: ObjectId::new(c, 1),
                expected: "data device",
            }
        );
        assert_eq!(err.reason(), "invalid_object");
    }

    #[test]
    fn serials_increase_and_wrap() {
        let mut seat = seat();
        let a = seat.next_serial();
        let b = seat.next_serial();
        assert_eq!(b, a.wrapping_add(1));

        seat.serial = u32::MAX;
        assert_eq!(seat.next_serial(), 0);
    }

    fn occupy(seat: &mut Seat, id: ObjectId) {
        seat.objects.insert(
            id,
            Object {
                kind: ObjectKind::Surface,
                destroy_signal: Signal::new(),
            },
        );
    }

    #[test]
    fn server_ids_start_at_base() {
        let mut seat = seat();
        let c = ClientId::new();
        assert_eq!(
            seat.allocate_server_id(c),
            Some(ObjectId::new(c, SERVER_ID_BASE))
        );
        assert_eq!(
            seat.allocate_server_id(c),
            Some(ObjectId::new(c, SERVER_ID_BASE + 1))
        );
    }

    #[test]
    fn server_ids_wrap_and_reuse_freed_ids() {
        let mut seat = seat();
        let c = ClientId::new();
        seat.server_ids = SERVER_ID_BASE..=SERVER_ID_BASE + 1;

        let a = seat.allocate_server_id(c).unwrap();
        occupy(&mut seat, a);
        let b = seat.allocate_server_id(c).unwrap();
        occupy(&mut seat, b);
        assert_eq!(seat.allocate_server_id(c), None, "every id is live");

        seat.objects.remove(&a);
        assert_eq!(seat.allocate_server_id(c), Some(a));
    }

    #[test]
    fn server_ids_wrap_past_u32_max() {
        let mut seat = seat();
        let c = ClientId::new();
        seat.next_server_id.insert(c, u32::MAX);
        occupy(&mut seat, ObjectId::new(c, SERVER_ID_BASE));

        assert_eq!(seat.allocate_server_id(c), Some(ObjectId::new(c, u32::MAX)));
        assert_eq!(
            seat.allocate_server_id(c),
            Some(ObjectId::new(c, SERVER_ID_BASE + 1)),
            "skips the live id after wrapping"
        );
    }

    #[test]
    fn remove_client_destroys_only_its_objects() {
        let mut seat = seat();
        let mut sink = RecordingSink::default();
        let a = app_with_device(&mut seat);
        let b = app_with_device(&mut seat);
        source_with(&mut seat, a.client, &["text/plain"], &mut sink);

        seat.remove_client(a.client, &mut sink);

        assert!(!seat.contains(a.surface));
        assert!(!seat.contains(a.device()));
        assert!(seat.contains(b.surface));
        assert!(seat.contains(b.device()));
        assert_eq!(seat.devices.find(a.client), None);
    }

    #[test]
    fn destroying_missing_object_is_noop() {
        let mut seat = seat();
        let mut sink = RecordingSink::default();
        seat.destroy_object(ObjectId::new(ClientId::new(), 7), &mut sink);
        assert!(sink.log.is_empty());
    }

    #[test]
    fn destroyed_surface_clears_pointer_and_keyboard_focus() {
        let mut seat = seat();
        let mut sink = RecordingSink::default();
        let a = app_with_device(&mut seat);
        seat.pointer_motion(1, Some(a.surface), 1.0, 1.0, &mut sink);
        seat.set_keyboard_focus(Some(a.surface), &mut sink);

        seat.destroy_surface(a.surface, &mut sink).unwrap();

        assert_eq!(seat.pointer.focus, None);
        assert!(seat.keyboard.focus.is_none());
    }
}
