//! hardware-buttons-daemon: hardware button event processor
//!
//! Turns raw press/release signals from the Home, Sleep, Volume-Up and
//! Volume-Down buttons into high-level events:
//! - taps and holds of Home and Sleep
//! - volume taps with autorepeat while held
//! - Home+Sleep and Home+Volume combos
//! - wake when Home or Sleep is pressed on a dark display
//!
//! Raw signals are read one per line from stdin (or `HWBUTTONS_INPUT`),
//! e.g. `home-button-press` or `volume-up release`, plus `display on|off`
//! to simulate the power state. Each emitted event is printed to stdout
//! as one JSON line; logs go to stderr.

mod buttons;
mod config;
mod events;
mod host;
mod lifecycle;
mod power;
mod state;

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::buttons::{ConsoleCommand, ConsoleListener};
use crate::config::Config;
use crate::host::{forward_console, Host, HostInput};
use crate::lifecycle::ShutdownSignal;
use crate::power::SharedDisplay;
use crate::state::TokioScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for events
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "hardware-buttons-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        display_on = config.display_on,
        input = ?config.input_path,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // Console listener -> forwarder
    let (console_tx, console_rx) = mpsc::channel::<ConsoleCommand>(32);
    // Signals, display changes and timer expiries -> host loop, in order
    let (input_tx, input_rx) = mpsc::channel::<HostInput>(64);

    let mut host = Host::new(
        SharedDisplay::new(config.display_on),
        TokioScheduler::new(&input_tx),
        std::io::stdout(),
    );

    let console_listener = ConsoleListener::new(console_tx);
    let started = match &config.input_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            console_listener.start(BufReader::new(file))
        }
        None => console_listener.start(BufReader::new(std::io::stdin())),
    };
    started.context("failed to start console listener")?;
    info!("console listener started");

    // Dropping `input_tx` at end of input lets the host drain and stop
    let forwarder = tokio::spawn(forward_console(console_rx, input_tx));

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = host.run(input_rx) => {
            if let Err(e) = result {
                error!(?e, "host loop error");
            }
            info!("host loop exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!(state = %host.state(), "shutting down...");

    if console_listener.is_running() {
        console_listener.stop();
    }
    forwarder.abort();

    info!("hardware-buttons-daemon stopped");

    Ok(())
}
