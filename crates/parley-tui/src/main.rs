//! Parley terminal client entry point.

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex, time::Duration};

use clap::Parser;
use parley_client::{Identity, Room, SessionConfig};
use parley_core::env::SystemEnv;
use parley_tui::{Runtime, TerminalDriver};
use tracing_subscriber::EnvFilter;

/// Parley terminal chat client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Terminal client for Parley chat rooms")]
#[command(version)]
struct Args {
    /// WebSocket URL of the chat server
    #[arg(short, long, default_value = "ws://127.0.0.1:3000/ws")]
    server: String,

    /// Username to join as
    #[arg(short, long)]
    username: String,

    /// Room to join
    #[arg(short, long, default_value = "General")]
    room: String,

    /// Send `set_username` before joining
    #[arg(long)]
    announce_username: bool,

    /// Idle milliseconds before typing is reported as stopped
    #[arg(long, default_value_t = 2000)]
    typing_debounce_ms: u64,

    /// File to write logs to; the terminal is owned by the UI
    #[arg(long, default_value = "parley.log")]
    log_file: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_file = OpenOptions::new().create(true).append(true).open(&args.log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let me = Identity::new(args.username)?;
    let room = Room::new(args.room)?;
    let config = SessionConfig {
        typing_debounce: Duration::from_millis(args.typing_debounce_ms),
        announce_identity: args.announce_username,
    };

    let driver = TerminalDriver::new()?;
    let runtime = Runtime::new(driver, SystemEnv::new(), me, room, config, args.server);

    Ok(runtime.run().await?)
}
