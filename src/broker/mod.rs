//! Broker daemon that hosts the seat behind a Unix socket.
//!
//! Applications connect with the `client` role and own surfaces, data
//! sources and data devices. The input driver connects with the `seat`
//! role, feeds pointer and keyboard input, and receives observer
//! notifications (selection changes, drag icons).
//!
//! Architecture: channel-based actor. A single broker loop owns all
//! mutable state ([`state::BrokerState`]). Per-connection tasks
//! forward requests via mpsc channels and receive their events through
//! per-connection event channels.

mod connection;
mod handler;
mod sink;
pub mod state;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use connection::{BrokerCommand, DisconnectNotice};
use sink::{BrokerSink, Delivery};
use state::{BrokerConfig, BrokerState};

use crate::ipc::protocol::Message;
use crate::seat::ClientId;

/// Environment variable overriding the socket path.
pub const SOCKET_ENV: &str = "SELECTD_SOCKET";

/// Broker startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("$XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("socket path {0} has no parent directory")]
    InvalidSocketPath(PathBuf),
    #[error("broker already running at {0}")]
    AlreadyRunning(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    MkdirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type EventSenders = HashMap<ClientId, mpsc::UnboundedSender<Message>>;

/// Run the broker daemon until SIGTERM or SIGINT.
///
/// # Errors
///
/// Returns `BrokerError` if no socket path can be resolved, socket bind
/// fails, or another broker is already running.
pub async fn run(config: BrokerConfig) -> Result<(), BrokerError> {
    let socket_path = resolve_socket_path(config.socket_path.as_deref())?;
    let listener = bind_socket(&socket_path).await?;

    tracing::info!(
        path = %socket_path.display(),
        max_mime_types = config.max_mime_types,
        "broker listening"
    );

    // Graceful shutdown on SIGTERM or SIGINT.
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
    };

    serve(listener, BrokerState::new(&config), shutdown).await;

    if let Err(e) = std::fs::remove_file(&socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "failed to remove socket");
    }
    tracing::info!("broker stopped");
    Ok(())
}

/// The broker loop. Returns when `shutdown` completes.
async fn serve(listener: UnixListener, mut state: BrokerState, shutdown: impl Future<Output = ()>) {
    // Channels for connection → broker communication.
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<BrokerCommand>();
    let (disconnect_tx, mut disconnect_rx) = mpsc::unbounded_channel::<DisconnectNotice>();

    let mut event_senders = EventSenders::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // -- New connection --
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        accept_connection(stream, &cmd_tx, &disconnect_tx, &mut event_senders);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }

            // -- Request from connection task --
            Some(cmd) = cmd_rx.recv() => {
                let (response, deliveries) =
                    handler::handle_message(&mut state, cmd.request, cmd.client);
                // The response goes out before any event the request produced.
                let _ = cmd.response_tx.send(response);
                dispatch(&state, &event_senders, deliveries);
            }

            // -- Connection disconnected --
            Some(notice) = disconnect_rx.recv() => {
                let client = notice.client;
                event_senders.remove(&client);
                let mut sink = BrokerSink::new();
                state.remove_connection(client, &mut sink);
                dispatch(&state, &event_senders, sink.into_deliveries());
                tracing::debug!(
                    %client,
                    objects = state.seat().object_count(),
                    dragging = state.seat().is_dragging(),
                    selection = ?state.seat().selection_source(),
                    "connection cleaned up"
                );
            }

            _ = &mut shutdown => break,
        }
    }
}

/// Accept a new connection: create its channels and spawn the handler task.
fn accept_connection(
    stream: UnixStream,
    cmd_tx: &mpsc::UnboundedSender<BrokerCommand>,
    disconnect_tx: &mpsc::UnboundedSender<DisconnectNotice>,
    event_senders: &mut EventSenders,
) {
    let client = ClientId::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    event_senders.insert(client, event_tx);

    connection::spawn_connection(
        stream,
        client,
        cmd_tx.clone(),
        event_rx,
        disconnect_tx.clone(),
    );

    tracing::debug!(%client, "accepted connection");
}

/// Route deliveries to connection tasks, preserving order.
fn dispatch(state: &BrokerState, event_senders: &EventSenders, deliveries: Vec<Delivery>) {
    for delivery in deliveries {
        match delivery {
            Delivery::Client { target, message } => send_event(event_senders, target, message),
            Delivery::Observers(message) => {
                for observer in state.observers() {
                    send_event(event_senders, observer, message.clone());
                }
            }
        }
    }
}

fn send_event(event_senders: &EventSenders, target: ClientId, message: Message) {
    match event_senders.get(&target) {
        Some(tx) => {
            if tx.send(message).is_err() {
                tracing::warn!(%target, "event send failed, connection gone");
            }
        }
        None => tracing::debug!(%target, "event target already gone"),
    }
}

// -- Socket setup --

/// Resolve the broker socket path.
///
/// Precedence: explicit path, then `$SELECTD_SOCKET`, then
/// `$XDG_RUNTIME_DIR/selectd/broker.sock`.
pub fn resolve_socket_path(explicit: Option<&Path>) -> Result<PathBuf, BrokerError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").map_err(|_| BrokerError::NoRuntimeDir)?;
    Ok(PathBuf::from(runtime_dir)
        .join("selectd")
        .join("broker.sock"))
}

/// Create the socket directory and bind the Unix listener.
///
/// Handles stale socket detection: if EADDRINUSE, attempts to connect
/// to the existing socket. If the connection succeeds, another broker
/// is running. If it fails, the socket is stale and is removed.
async fn bind_socket(path: &Path) -> Result<UnixListener, BrokerError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| BrokerError::InvalidSocketPath(path.to_path_buf()))?;
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| BrokerError::MkdirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    // Always set directory permissions to 0700, even if it already existed.
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            BrokerError::MkdirFailed {
                path: parent.to_path_buf(),
                source: e,
            }
        })?;
    }

    let bind_failed = |source| BrokerError::BindFailed {
        path: path.to_path_buf(),
        source,
    };
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(BrokerError::AlreadyRunning(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path).map_err(bind_failed)?;
            UnixListener::bind(path).map_err(bind_failed)
        }
        Err(e) => Err(bind_failed(e)),
    }
}
