mod broker;
mod cli;
mod client;
mod ipc;
mod seat;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Broker {
            socket,
            max_mime_types,
        } => {
            let config = broker::state::BrokerConfig {
                socket_path: socket,
                max_mime_types,
            };
            if let Err(e) = broker::run(config).await {
                tracing::error!(error = %e, "broker failed");
                eprintln!("selectd broker: {e}");
                std::process::exit(1);
            }
        }
        Command::Client { socket, action } => {
            if let Err(e) = client::run(socket, action).await {
                tracing::error!(error = %e, "client failed");
                eprintln!("selectd client: {e}");
                std::process::exit(1);
            }
        }
    }
}
