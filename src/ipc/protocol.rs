//! Wire protocol message types for broker IPC.
//!
//! Every frame is a MessagePack map with at least `type` and `id`.
//! Requests carry a non-zero `id` that the matching `response` echoes;
//! events and notifications are unsolicited and carry `id = 0`.
//!
//! Application connections address their own objects by bare `u32` ids.
//! Seat connections address surfaces of any connection with an
//! [`ObjectRef`].

use serde::{Deserialize, Serialize};

use crate::seat::{ButtonState, ClientId, ObjectId};

/// All wire protocol messages.
///
/// Serialized as a tagged union on the `type` field via MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    // -- Handshake --
    Hello {
        id: u32,
        version: u32,
        role: Role,
    },

    HelloAck {
        id: u32,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Connection id assigned by the broker.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<u64>,
    },

    // -- Manager requests --
    CreateSurface {
        id: u32,
        object: u32,
    },

    DestroySurface {
        id: u32,
        object: u32,
    },

    CreateDataSource {
        id: u32,
        object: u32,
    },

    GetDataDevice {
        id: u32,
        object: u32,
    },

    // -- Data source requests --
    SourceOffer {
        id: u32,
        source: u32,
        mime_type: String,
    },

    SourceDestroy {
        id: u32,
        source: u32,
    },

    // -- Data device requests --
    StartDrag {
        id: u32,
        device: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<u32>,
        origin: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<u32>,
        serial: u32,
    },

    SetSelection {
        id: u32,
        device: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<u32>,
        serial: u32,
    },

    ReleaseDevice {
        id: u32,
        device: u32,
    },

    // -- Data offer requests --
    OfferAccept {
        id: u32,
        offer: u32,
        serial: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// `destination` is an absolute path the receiver created and owns,
    /// typically a FIFO. The broker rejects relative paths with
    /// `invalid_destination`.
    ///
    /// The path is forwarded to the source's owner, which writes with
    /// its own privileges. Sources must open it write-only without
    /// `O_CREAT` or `O_TRUNC`, and should refuse anything that is not a
    /// FIFO or socket, so a receiver cannot point them at a file of
    /// theirs.
    OfferReceive {
        id: u32,
        offer: u32,
        mime_type: String,
        destination: String,
    },

    OfferDestroy {
        id: u32,
        offer: u32,
    },

    // -- Seat input (seat role only) --
    PointerMotion {
        id: u32,
        time: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surface: Option<ObjectRef>,
        x: f64,
        y: f64,
    },

    PointerButton {
        id: u32,
        time: u32,
        button: u32,
        state: ButtonState,
    },

    KeyboardFocus {
        id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surface: Option<ObjectRef>,
    },

    // -- Events (broker → client) --
    DataOffer {
        id: u32,
        device: u32,
        offer: u32,
    },

    OfferMime {
        id: u32,
        offer: u32,
        mime_type: String,
    },

    Enter {
        id: u32,
        device: u32,
        serial: u32,
        surface: u32,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offer: Option<u32>,
    },

    Leave {
        id: u32,
        device: u32,
    },

    Motion {
        id: u32,
        device: u32,
        time: u32,
        x: f64,
        y: f64,
    },

    Drop {
        id: u32,
        device: u32,
    },

    Selection {
        id: u32,
        device: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offer: Option<u32>,
    },

    Target {
        id: u32,
        source: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// Write the payload to `destination`. Open it without creating or
    /// truncating anything; see [`Message::OfferReceive`].
    Send {
        id: u32,
        source: u32,
        mime_type: String,
        destination: String,
    },

    Cancelled {
        id: u32,
        source: u32,
    },

    /// Protocol error scoped to one object, e.g. `no_memory`.
    Error {
        id: u32,
        object: u32,
        code: String,
    },

    // -- Notifications (broker → seat) --
    SelectionChanged {
        id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<ObjectRef>,
    },

    DragIcon {
        id: u32,
        surface: ObjectRef,
    },

    Attach {
        id: u32,
        surface: ObjectRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buffer: Option<ObjectRef>,
        x: i32,
        y: i32,
    },

    // -- Generic response --
    Response {
        id: u32,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Display serial drawn by seat input requests.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        serial: Option<u32>,
    },
}

impl Message {
    /// Successful response to request `id`.
    pub fn ok(id: u32) -> Self {
        Message::Response {
            id,
            status: Status::Ok,
            error: None,
            serial: None,
        }
    }

    /// Successful response carrying a display serial.
    pub fn ok_serial(id: u32, serial: u32) -> Self {
        Message::Response {
            id,
            status: Status::Ok,
            error: None,
            serial: Some(serial),
        }
    }

    /// Error response with a machine-readable reason.
    pub fn error(id: u32, reason: &str) -> Self {
        Message::Response {
            id,
            status: Status::Error,
            error: Some(reason.to_string()),
            serial: None,
        }
    }
}

/// Connection role in the handshake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An application owning surfaces, sources and devices.
    Client,
    /// The input driver, and observers of selection and drag state.
    Seat,
}

/// Response status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// An object of any connection, as seen by seat connections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectRef {
    pub client: u64,
    pub id: u32,
}

impl From<ObjectId> for ObjectRef {
    fn from(object: ObjectId) -> Self {
        Self {
            client: object.client.as_raw(),
            id: object.id,
        }
    }
}

impl From<ObjectRef> for ObjectId {
    fn from(object: ObjectRef) -> Self {
        ObjectId::new(ClientId::from_raw(object.client), object.id)
    }
}

pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Minimal envelope for extracting `{type, id}` from unknown messages.
///
/// Used by the broker as a fallback when [`Message`] deserialization
/// fails (e.g., unknown `type` tag), so the error response can still
/// echo the request `id`.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    /// Consumed by serde for structural matching; not read by broker code.
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub msg_type: String,
    pub id: u32,
}
