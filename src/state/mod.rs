//! State machine module for hardware button gestures
//!
//! Provides an explicit state machine with five states:
//! - Base: no button held
//! - Home / Sleep: one of the two main buttons held
//! - Volume: a volume button held, with autorepeat
//! - Wake: Home or Sleep pressed while the display was off

mod machine;
mod timer;

pub use machine::{ButtonStateMachine, State};
pub use timer::{MachineInput, Scheduler, TimerToken, TokioScheduler};
