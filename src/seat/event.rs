//! Outgoing events and the transport seam they leave through.

use std::os::fd::OwnedFd;
use std::path::PathBuf;

use super::ObjectId;

/// Where the receiving connection wants the payload written.
///
/// The seat never reads or writes through it. Forwarding a destination
/// moves it to the transport; a destination that is not forwarded is
/// dropped, which closes a descriptor.
#[derive(Debug)]
#[allow(dead_code)]
pub enum Destination {
    Fd(OwnedFd),
    Path(PathBuf),
}

/// An event addressed to one object.
#[derive(Debug)]
pub enum Event {
    // -- data device --
    DataOffer {
        offer: ObjectId,
    },
    Enter {
        serial: u32,
        surface: ObjectId,
        x: f64,
        y: f64,
        offer: Option<ObjectId>,
    },
    Leave,
    Motion {
        time: u32,
        x: f64,
        y: f64,
    },
    Drop,
    Selection {
        offer: Option<ObjectId>,
    },

    // -- data offer --
    Offer {
        mime_type: String,
    },

    // -- data source --
    Target {
        mime_type: Option<String>,
    },
    Send {
        mime_type: String,
        destination: Destination,
    },
    Cancelled,
}

/// Everything the seat needs from the transport and its collaborators.
pub trait EventSink {
    /// Queue `event` for the connection owning `resource`.
    fn send(&mut self, resource: ObjectId, event: Event);

    /// Report an allocation failure scoped to `resource`.
    fn post_no_memory(&mut self, resource: ObjectId);

    /// Surface content collaborator. `buffer == None` detaches.
    fn attach(&mut self, surface: ObjectId, buffer: Option<ObjectId>, x: i32, y: i32);

    /// The selection source changed (or went away).
    fn selection_changed(&mut self, _source: Option<ObjectId>) {}

    /// A drag started with `surface` as its icon.
    fn drag_icon(&mut self, _surface: ObjectId) {}
}
