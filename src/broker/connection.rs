//! Per-connection task: framed I/O, handshake, command forwarding.
//!
//! Each connection spawns a tokio task that:
//! 1. Wraps the socket in a length-prefixed MessagePack codec.
//! 2. Reads the first message (must be `Hello`) and forwards it to
//!    the broker loop for handshake validation.
//! 3. Enters a select loop: forward requests to the broker loop and
//!    write unsolicited events routed to this connection.
//! 4. On disconnect, notifies the broker loop for cleanup.

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;

use crate::ipc::codec::{CodecError, DecodeResult, FrameCodec, decode_frame};
use crate::ipc::protocol::{Message, Status};
use crate::seat::ClientId;

/// Command sent from a connection task to the broker loop.
#[derive(Debug)]
pub struct BrokerCommand {
    pub request: Message,
    pub response_tx: oneshot::Sender<Message>,
    pub client: ClientId,
}

/// Notification sent when a connection closes.
#[derive(Debug)]
pub struct DisconnectNotice {
    pub client: ClientId,
}

/// Connection-level errors.
#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error("unexpected EOF during handshake")]
    HandshakeEof,
    #[error("first message must be Hello")]
    NotHello,
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] rmp_serde::decode::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("broker loop closed")]
    BrokerGone,
    #[error("response channel closed")]
    ResponseDropped,
}

/// Spawn a connection handler task.
///
/// The task runs until the peer disconnects or a protocol error
/// occurs. On exit, a [`DisconnectNotice`] is sent to the broker loop.
pub fn spawn_connection(
    stream: UnixStream,
    client: ClientId,
    cmd_tx: mpsc::UnboundedSender<BrokerCommand>,
    event_rx: mpsc::UnboundedReceiver<Message>,
    disconnect_tx: mpsc::UnboundedSender<DisconnectNotice>,
) {
    tokio::spawn(async move {
        if let Err(e) = handle_connection(stream, client, cmd_tx, event_rx).await {
            tracing::debug!(%client, error = %e, "connection closed");
        }
        // Always notify broker of disconnect for cleanup.
        let _ = disconnect_tx.send(DisconnectNotice { client });
    });
}

async fn handle_connection(
    stream: UnixStream,
    client: ClientId,
    cmd_tx: mpsc::UnboundedSender<BrokerCommand>,
    mut event_rx: mpsc::UnboundedReceiver<Message>,
) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(stream, FrameCodec::new());

    // -- Handshake: first message must be Hello --
    let first_frame = framed
        .next()
        .await
        .ok_or(ConnectionError::HandshakeEof)?
        .map_err(ConnectionError::Codec)?;

    let hello = match decode_frame(&first_frame) {
        DecodeResult::Ok(msg @ Message::Hello { .. }) => msg,
        // Anything else first is a protocol violation; close without a reply.
        DecodeResult::Ok(_) | DecodeResult::UnknownType(_) => {
            return Err(ConnectionError::NotHello);
        }
        DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
    };

    let ack = send_command(&cmd_tx, hello, client).await?;
    let rejected = matches!(
        ack,
        Message::HelloAck {
            status: Status::Error,
            ..
        }
    );
    framed.send(ack).await.map_err(ConnectionError::Codec)?;
    if rejected {
        return Ok(());
    }

    // -- Main loop: requests + event delivery --
    loop {
        tokio::select! {
            frame = framed.next() => {
                let raw = match frame {
                    Some(Ok(raw)) => raw,
                    Some(Err(e)) => return Err(ConnectionError::Codec(e)),
                    None => return Ok(()), // Clean disconnect.
                };
                let response = match decode_frame(&raw) {
                    DecodeResult::Ok(msg) => send_command(&cmd_tx, msg, client).await?,
                    // Unknown message type: answer with the echoed id, keep the connection.
                    DecodeResult::UnknownType(envelope) => {
                        Message::error(envelope.id, "unknown_type")
                    }
                    DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
                };
                framed.send(response).await.map_err(ConnectionError::Codec)?;
            }
            event = event_rx.recv() => {
                match event {
                    Some(msg) => framed.send(msg).await.map_err(ConnectionError::Codec)?,
                    // Broker loop dropped our event sender, so it is shutting down.
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Send a command to the broker loop and wait for the response.
async fn send_command(
    cmd_tx: &mpsc::UnboundedSender<BrokerCommand>,
    request: Message,
    client: ClientId,
) -> Result<Message, ConnectionError> {
    let (response_tx, response_rx) = oneshot::channel();
    cmd_tx
        .send(BrokerCommand {
            request,
            response_tx,
            client,
        })
        .map_err(|_| ConnectionError::BrokerGone)?;
    response_rx
        .await
        .map_err(|_| ConnectionError::ResponseDropped)
}
