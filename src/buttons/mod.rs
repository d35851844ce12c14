//! Buttons module for raw hardware signals
//!
//! Defines the press/release vocabulary of the four fixed buttons and a
//! console listener that feeds them to the state machine.

mod listener;
mod signal;

pub use listener::{ConsoleCommand, ConsoleListener};
pub use signal::{Button, Edge, RawSignal};
