//! Deferred-callback scheduling for the state machine
//!
//! The machine owns timer handles but not the timing primitive. A fired
//! timer comes back as a [`MachineInput::TimerFired`] carrying the token it
//! was armed with, so a callback that slips past cancellation is detected
//! as stale and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::buttons::RawSignal;

/// Generation number identifying one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Inputs accepted by [`ButtonStateMachine::process`](super::ButtonStateMachine::process)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineInput {
    /// A raw button edge from the host
    Signal(RawSignal),
    /// A previously armed timer expired
    TimerFired(TimerToken),
}

impl From<TimerToken> for MachineInput {
    fn from(token: TimerToken) -> Self {
        MachineInput::TimerFired(token)
    }
}

/// Single-shot timer service
pub trait Scheduler {
    type Handle;

    /// Arrange for `token` to be delivered back to the machine after `delay`
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> Self::Handle;

    /// Cancel a timer. A cancelled timer must not be delivered afterwards,
    /// or if it is, must carry a token the machine no longer holds.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Scheduler backed by tokio tasks
///
/// Each timer is a task that sleeps and then posts the token, converted
/// into the channel's item type, onto the same queue that carries button
/// signals. Only a weak sender is held so pending timers never keep the
/// channel open once the host has hung up.
pub struct TokioScheduler<T> {
    input_tx: mpsc::WeakSender<T>,
}

impl<T> TokioScheduler<T> {
    pub fn new(input_tx: &mpsc::Sender<T>) -> Self {
        Self {
            input_tx: input_tx.downgrade(),
        }
    }
}

impl<T> Scheduler for TokioScheduler<T>
where
    T: From<TimerToken> + Send + 'static,
{
    type Handle = JoinHandle<()>;

    fn schedule(&mut self, delay: Duration, token: TimerToken) -> Self::Handle {
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(input_tx) = input_tx.upgrade() {
                // Receiver gone means the machine has stopped
                let _ = input_tx.send(T::from(token)).await;
            }
        })
    }

    fn cancel(&mut self, handle: Self::Handle) {
        handle.abort();
    }
}
