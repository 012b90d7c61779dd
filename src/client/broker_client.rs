//! Seat-role connection to the broker, used by the CLI client.

use std::path::Path;

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::ipc::codec::MessageCodec;
use crate::ipc::protocol::{Message, ObjectRef, PROTOCOL_VERSION, Role, Status};
use crate::seat::ButtonState;

use super::ClientError;

/// One-shot requests need no split sink/stream: each CLI invocation
/// performs a single request-response cycle, or only reads.
pub struct BrokerClient {
    framed: Framed<UnixStream, MessageCodec>,
    next_id: u32,
}

impl BrokerClient {
    /// Connect to the broker as a seat and perform the handshake.
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ClientError::Broker(format!("connect failed: {e}")))?;
        let mut framed = Framed::new(stream, MessageCodec::new());

        framed
            .send(Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
                role: Role::Seat,
            })
            .await?;

        match framed.next().await {
            Some(Ok(Message::HelloAck {
                status: Status::Ok, ..
            })) => {}
            Some(Ok(Message::HelloAck {
                status: Status::Error,
                error,
                ..
            })) => {
                return Err(ClientError::Broker(format!(
                    "handshake rejected: {}",
                    error.unwrap_or_default()
                )));
            }
            other => {
                return Err(ClientError::Broker(format!(
                    "unexpected handshake response: {other:?}"
                )));
            }
        }

        Ok(Self {
            framed,
            next_id: 1, // 0 = Hello
        })
    }

    /// Returns the serial of the focus change.
    pub async fn keyboard_focus(&mut self, surface: Option<ObjectRef>) -> Result<u32, ClientError> {
        let id = self.take_id();
        let serial = self
            .request(Message::KeyboardFocus { id, surface }, "keyboard_focus")
            .await?;
        serial.ok_or_else(|| ClientError::Broker("keyboard_focus response without serial".into()))
    }

    pub async fn pointer_motion(
        &mut self,
        time: u32,
        surface: Option<ObjectRef>,
        x: f64,
        y: f64,
    ) -> Result<(), ClientError> {
        let id = self.take_id();
        self.request(
            Message::PointerMotion {
                id,
                time,
                surface,
                x,
                y,
            },
            "pointer_motion",
        )
        .await?;
        Ok(())
    }

    /// Returns the serial of the button event.
    pub async fn pointer_button(
        &mut self,
        time: u32,
        button: u32,
        state: ButtonState,
    ) -> Result<u32, ClientError> {
        let id = self.take_id();
        let serial = self
            .request(
                Message::PointerButton {
                    id,
                    time,
                    button,
                    state,
                },
                "pointer_button",
            )
            .await?;
        serial.ok_or_else(|| ClientError::Broker("pointer_button response without serial".into()))
    }

    /// Next unsolicited message, or `None` once the broker hangs up.
    pub async fn next_notification(&mut self) -> Result<Option<Message>, ClientError> {
        match self.framed.next().await {
            Some(msg) => Ok(Some(msg?)),
            None => Ok(None),
        }
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Send a request and wait for its response, skipping notifications.
    ///
    /// Returns the response's serial, if any.
    async fn request(&mut self, msg: Message, what: &str) -> Result<Option<u32>, ClientError> {
        self.framed.send(msg).await?;
        loop {
            match self.framed.next().await {
                Some(Ok(Message::Response {
                    status: Status::Ok,
                    serial,
                    ..
                })) => return Ok(serial),
                Some(Ok(Message::Response { error, .. })) => {
                    return Err(ClientError::Broker(format!(
                        "{what} failed: {}",
                        error.unwrap_or_default()
                    )));
                }
                Some(Ok(notification)) => {
                    tracing::trace!(?notification, "skipping notification");
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(ClientError::Broker(format!(
                        "connection closed awaiting {what}"
                    )));
                }
            }
        }
    }
}
