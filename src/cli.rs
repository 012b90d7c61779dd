use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::seat::{ButtonState, SeatConfig};

#[derive(Parser)]
#[command(name = "selectd", about = "Clipboard and drag-and-drop broker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the broker daemon
    Broker {
        /// Socket path (default: $SELECTD_SOCKET, then $XDG_RUNTIME_DIR/selectd/broker.sock)
        #[arg(long)]
        socket: Option<PathBuf>,

        /// MIME types a single data source may advertise
        #[arg(long, default_value_t = SeatConfig::default().max_mime_types)]
        max_mime_types: usize,
    },

    /// Drive or observe the seat of a running broker
    Client {
        /// Socket path of the broker to talk to
        #[arg(long, global = true)]
        socket: Option<PathBuf>,

        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Print selection and drag notifications until the broker exits
    Watch,

    /// Move keyboard focus to a surface, or clear it
    Focus {
        #[command(flatten)]
        surface: SurfaceArgs,
    },

    /// Move the pointer
    Motion {
        /// Event timestamp in milliseconds
        #[arg(long, default_value_t = 0)]
        time: u32,

        #[command(flatten)]
        surface: SurfaceArgs,

        #[arg(long, allow_negative_numbers = true)]
        x: f64,

        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },

    /// Press or release a pointer button
    Button {
        /// Event timestamp in milliseconds
        #[arg(long, default_value_t = 0)]
        time: u32,

        /// Button code (e.g. 272 for the left button)
        #[arg(long)]
        button: u32,

        #[arg(long, value_enum)]
        state: ButtonArg,
    },
}

/// A surface of any connection. Omit both to mean "no surface".
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct SurfaceArgs {
    /// Connection id of the surface's owner
    #[arg(long, requires = "surface")]
    pub client: Option<u64>,

    /// Surface object id within that connection
    #[arg(long, requires = "client")]
    pub surface: Option<u32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonArg {
    Pressed,
    Released,
}

impl From<ButtonArg> for ButtonState {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Pressed => ButtonState::Pressed,
            ButtonArg::Released => ButtonState::Released,
        }
    }
}
