//! Host loop around the button state machine
//!
//! Everything that can change what the machine sees travels through one
//! ordered queue: button signals, display commands and timer expiries.
//! Events produced by a step are dispatched, and the screen policy
//! applied, before the next queued input is taken.

use std::io::Write;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::buttons::ConsoleCommand;
use crate::events::HardwareEvent;
use crate::power::{ScreenPolicy, SharedDisplay};
use crate::state::{ButtonStateMachine, MachineInput, Scheduler, State, TimerToken};

/// Items on the host's input queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    /// Something for the state machine
    Machine(MachineInput),
    /// Simulated display power change
    Display(bool),
}

impl From<TimerToken> for HostInput {
    fn from(token: TimerToken) -> Self {
        HostInput::Machine(MachineInput::TimerFired(token))
    }
}

impl From<ConsoleCommand> for HostInput {
    fn from(command: ConsoleCommand) -> Self {
        match command {
            ConsoleCommand::Signal(signal) => HostInput::Machine(MachineInput::Signal(signal)),
            ConsoleCommand::Display(on) => HostInput::Display(on),
        }
    }
}

/// Forward console commands onto the host queue, in order. Returns at end
/// of input, dropping `input_tx` so the host loop can finish.
pub async fn forward_console(
    mut console_rx: mpsc::Receiver<ConsoleCommand>,
    input_tx: mpsc::Sender<HostInput>,
) {
    while let Some(command) = console_rx.recv().await {
        if input_tx.send(command.into()).await.is_err() {
            break;
        }
    }
    info!("console input closed");
}

/// Owns the state machine, the display and the event output
pub struct Host<S: Scheduler, W> {
    machine: ButtonStateMachine<SharedDisplay, S>,
    display: SharedDisplay,
    policy: ScreenPolicy,
    event_rx: broadcast::Receiver<HardwareEvent>,
    out: W,
}

impl<S: Scheduler, W: Write> Host<S, W> {
    /// Create a host; events are written to `out` as JSON lines
    pub fn new(display: SharedDisplay, scheduler: S, out: W) -> Self {
        let (event_tx, event_rx) = broadcast::channel(64);
        Self {
            machine: ButtonStateMachine::new(display.clone(), scheduler, event_tx),
            policy: ScreenPolicy::new(display.clone()),
            display,
            event_rx,
            out,
        }
    }

    /// Process queued inputs until every sender is gone
    pub async fn run(&mut self, mut input_rx: mpsc::Receiver<HostInput>) -> Result<()> {
        info!("host loop started in Base state");

        while let Some(input) = input_rx.recv().await {
            match input {
                HostInput::Machine(input) => self.machine.process(input),
                HostInput::Display(on) => self.display.set(on),
            }
            self.dispatch()?;
        }

        self.machine.stop();
        Ok(())
    }

    /// Current state of the machine
    pub fn state(&self) -> State {
        self.machine.state()
    }

    fn dispatch(&mut self) -> Result<()> {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.policy.apply(event);
                    match serde_json::to_string(&event) {
                        Ok(line) => writeln!(self.out, "{line}")?,
                        Err(e) => error!(?e, %event, "failed to encode event"),
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(skipped = n, "event output lagged");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => break,
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
