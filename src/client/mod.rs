//! CLI client for driving and observing the seat.
//!
//! Connects to the broker with the `seat` role. `watch` streams
//! observer notifications; the other actions inject one input event,
//! print the resulting serial where there is one, and exit.

mod broker_client;
mod format;

use std::path::PathBuf;

use crate::broker::{BrokerError, resolve_socket_path};
use crate::cli::{ClientAction, SurfaceArgs};
use crate::ipc::codec::CodecError;
use crate::ipc::protocol::ObjectRef;
use broker_client::BrokerClient;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("broker: {0}")]
    Broker(String),
    #[error("socket: {0}")]
    Socket(#[from] BrokerError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Run the client command. Called from `main.rs` for `Command::Client`.
pub async fn run(socket: Option<PathBuf>, action: ClientAction) -> Result<(), ClientError> {
    let socket_path = resolve_socket_path(socket.as_deref())?;
    let mut broker = BrokerClient::connect(&socket_path).await?;

    match action {
        ClientAction::Watch => {
            while let Some(msg) = broker.next_notification().await? {
                format::print_notification(&msg);
            }
            tracing::info!("broker closed the connection");
        }
        ClientAction::Focus { surface } => {
            let serial = broker.keyboard_focus(surface_ref(surface)).await?;
            format::print_serial("focus", serial);
        }
        ClientAction::Motion {
            time,
            surface,
            x,
            y,
        } => {
            broker
                .pointer_motion(time, surface_ref(surface), x, y)
                .await?;
        }
        ClientAction::Button {
            time,
            button,
            state,
        } => {
            let serial = broker.pointer_button(time, button, state.into()).await?;
            format::print_serial("button", serial);
        }
    }

    Ok(())
}

/// Both halves present names a surface; clap guarantees they come together.
fn surface_ref(args: SurfaceArgs) -> Option<ObjectRef> {
    match (args.client, args.surface) {
        (Some(client), Some(id)) => Some(ObjectRef { client, id }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_ref_requires_both_halves() {
        assert_eq!(
            surface_ref(SurfaceArgs {
                client: Some(3),
                surface: Some(1),
            }),
            Some(ObjectRef { client: 3, id: 1 })
        );
        assert_eq!(
            surface_ref(SurfaceArgs {
                client: None,
                surface: None,
            }),
            None
        );
    }
}
