//! Console input listener
//!
//! Reads raw button signals, one per line, from stdin or a file and
//! forwards them to the daemon. Runs on a dedicated thread because line
//! reads block.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::signal::{ParseSignalError, RawSignal};

/// Commands sent from the console listener to the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// A raw button edge
    Signal(RawSignal),
    /// Simulated display power change (`display on` / `display off`)
    Display(bool),
}

impl ConsoleCommand {
    /// Parse one console line. Returns `Ok(None)` for blank lines and
    /// `#` comments.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ParseSignalError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut parts = line.split_whitespace();
        if parts
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("display"))
        {
            return match (parts.next().map(str::to_ascii_lowercase), parts.next()) {
                (Some(state), None) if state == "on" => Ok(Some(ConsoleCommand::Display(true))),
                (Some(state), None) if state == "off" => Ok(Some(ConsoleCommand::Display(false))),
                _ => Err(ParseSignalError::Malformed(line.to_string())),
            };
        }

        line.parse().map(|signal| Some(ConsoleCommand::Signal(signal)))
    }
}

/// Listener that turns console lines into [`ConsoleCommand`]s
pub struct ConsoleListener {
    command_tx: mpsc::Sender<ConsoleCommand>,
    running: Arc<AtomicBool>,
}

impl ConsoleListener {
    /// Create a new console listener
    pub fn new(command_tx: mpsc::Sender<ConsoleCommand>) -> Self {
        Self {
            command_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading from `reader` on a dedicated thread
    ///
    /// The thread stops at end of input, on a read error, when the
    /// receiving side is dropped, or once `stop()` has been called and the
    /// next line arrives.
    pub fn start<R>(&self, reader: R) -> Result<(), ListenerError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let command_tx = self.command_tx.clone();
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("console-listener".to_string())
            .spawn(move || {
                info!("console listener thread started");

                if let Err(e) = read_lines(reader, command_tx, &running) {
                    error!(%e, "console listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("console listener thread stopped");
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(ListenerError::ThreadSpawn(e.to_string()));
        }

        Ok(())
    }

    /// Stop the listener
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the console listener
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("console listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to read console input: {0}")]
    Read(#[from] std::io::Error),
}

fn read_lines<R: BufRead>(
    reader: R,
    command_tx: mpsc::Sender<ConsoleCommand>,
    running: &AtomicBool,
) -> Result<(), ListenerError> {
    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = line?;
        let command = match ConsoleCommand::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = index + 1, %e, "skipping console line");
                continue;
            }
        };

        debug!(?command, "console command");

        // Not in an async context, so block until the daemon has room
        if command_tx.blocking_send(command).is_err() {
            warn!("failed to send console command - channel closed?");
            break;
        }
    }

    Ok(())
}
