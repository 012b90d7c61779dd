//! Message dispatch and request handling.
//!
//! Pure logic, no I/O. Each request runs against [`BrokerState`] with a
//! fresh [`BrokerSink`]; the handler returns the response together with
//! every [`Delivery`] the request produced, in emission order.

use std::path::PathBuf;

use crate::ipc::protocol::{Message, PROTOCOL_VERSION, Role, Status};
use crate::seat::{ClientId, Destination, ObjectId, RequestError};

use super::sink::{BrokerSink, Delivery};
use super::state::BrokerState;

/// Dispatch a request message to the appropriate handler.
///
/// Returns `(response, deliveries)`. The broker loop sends the response
/// back to the requesting connection and then routes the deliveries.
///
/// Enforces:
/// - Role-based access: seat input from application connections is
///   answered with `unknown_type`
/// - Server-originated variants → `unknown_type`
pub fn handle_message(
    state: &mut BrokerState,
    request: Message,
    client: ClientId,
) -> (Message, Vec<Delivery>) {
    let mut sink = BrokerSink::new();
    let object = |id: u32| ObjectId::new(client, id);

    let response = match request {
        Message::Hello { id, version, role } => handle_hello(state, id, version, role, client),

        // -- Manager --
        Message::CreateSurface { id, object: o } => {
            respond(id, state.seat_mut().create_surface(object(o)))
        }
        Message::DestroySurface { id, object: o } => {
            respond(id, state.seat_mut().destroy_surface(object(o), &mut sink))
        }
        Message::CreateDataSource { id, object: o } => {
            respond(id, state.seat_mut().create_data_source(object(o)))
        }
        Message::GetDataDevice { id, object: o } => {
            respond(id, state.seat_mut().get_data_device(object(o)))
        }

        // -- Data source --
        Message::SourceOffer {
            id,
            source,
            mime_type,
        } => respond(
            id,
            state
                .seat_mut()
                .source_offer(object(source), mime_type, &mut sink),
        ),
        Message::SourceDestroy { id, source } => {
            respond(id, state.seat_mut().source_destroy(object(source), &mut sink))
        }

        // -- Data device --
        Message::StartDrag {
            id,
            device,
            source,
            origin,
            icon,
            serial,
        } => respond(
            id,
            state.seat_mut().start_drag(
                object(device),
                source.map(object),
                object(origin),
                icon.map(object),
                serial,
                &mut sink,
            ),
        ),
        Message::SetSelection {
            id,
            device,
            source,
            serial,
        } => respond(
            id,
            state
                .seat_mut()
                .set_selection(object(device), source.map(object), serial, &mut sink),
        ),
        Message::ReleaseDevice { id, device } => {
            respond(id, state.seat_mut().release_device(object(device), &mut sink))
        }

        // -- Data offer --
        Message::OfferAccept {
            id,
            offer,
            serial,
            mime_type,
        } => respond(
            id,
            state
                .seat_mut()
                .offer_accept(object(offer), serial, mime_type, &mut sink),
        ),
        Message::OfferReceive {
            id,
            offer,
            mime_type,
            destination,
        } => {
            let destination = PathBuf::from(destination);
            if !destination.is_absolute() {
                tracing::debug!(id, path = %destination.display(), "relative destination rejected");
                return (Message::error(id, "invalid_destination"), Vec::new());
            }
            respond(
                id,
                state.seat_mut().offer_receive(
                    object(offer),
                    mime_type,
                    Destination::Path(destination),
                    &mut sink,
                ),
            )
        }
        Message::OfferDestroy { id, offer } => {
            respond(id, state.seat_mut().offer_destroy(object(offer), &mut sink))
        }

        // -- Seat input (seat role only) --
        Message::PointerMotion {
            id,
            time,
            surface,
            x,
            y,
        } => {
            if !is_seat(state, client) {
                return (Message::error(id, "unknown_type"), Vec::new());
            }
            state
                .seat_mut()
                .pointer_motion(time, surface.map(ObjectId::from), x, y, &mut sink);
            Message::ok(id)
        }
        Message::PointerButton {
            id,
            time,
            button,
            state: button_state,
        } => {
            if !is_seat(state, client) {
                return (Message::error(id, "unknown_type"), Vec::new());
            }
            let serial = state
                .seat_mut()
                .pointer_button(time, button, button_state, &mut sink);
            Message::ok_serial(id, serial)
        }
        Message::KeyboardFocus { id, surface } => {
            if !is_seat(state, client) {
                return (Message::error(id, "unknown_type"), Vec::new());
            }
            let serial = state
                .seat_mut()
                .set_keyboard_focus(surface.map(ObjectId::from), &mut sink);
            Message::ok_serial(id, serial)
        }

        // Server-originated messages should never be sent by peers.
        Message::HelloAck { id, .. }
        | Message::Response { id, .. }
        | Message::DataOffer { id, .. }
        | Message::OfferMime { id, .. }
        | Message::Enter { id, .. }
        | Message::Leave { id, .. }
        | Message::Motion { id, .. }
        | Message::Drop { id, .. }
        | Message::Selection { id, .. }
        | Message::Target { id, .. }
        | Message::Send { id, .. }
        | Message::Cancelled { id, .. }
        | Message::Error { id, .. }
        | Message::SelectionChanged { id, .. }
        | Message::DragIcon { id, .. }
        | Message::Attach { id, .. } => Message::error(id, "unknown_type"),
    };

    (response, sink.into_deliveries())
}

fn handle_hello(
    state: &mut BrokerState,
    id: u32,
    version: u32,
    role: Role,
    client: ClientId,
) -> Message {
    let failure = |reason: &str| Message::HelloAck {
        id: 0,
        status: Status::Error,
        error: Some(reason.into()),
        client: None,
    };
    if id != 0 {
        return failure("invalid_hello_id");
    }
    if version != PROTOCOL_VERSION {
        return failure("version_mismatch");
    }
    if !state.add_connection(client, role) {
        return failure("already_connected");
    }
    tracing::info!(%client, ?role, "connection registered");
    Message::HelloAck {
        id: 0,
        status: Status::Ok,
        error: None,
        client: Some(client.as_raw()),
    }
}

/// Map a seat result onto the wire response.
fn respond(id: u32, result: Result<(), RequestError>) -> Message {
    match result {
        Ok(()) => Message::ok(id),
        Err(e) => {
            tracing::debug!(id, error = %e, "request rejected");
            Message::error(id, e.reason())
        }
    }
}

fn is_seat(state: &BrokerState, client: ClientId) -> bool {
    state.connection_role(client) == Some(Role::Seat)
}
