//! Display power state
//!
//! The state machine only ever asks one question of the power subsystem:
//! is the display on? The host answers it and keeps the answer current
//! by applying the screen policy to emitted events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::events::HardwareEvent;

/// Query capability consulted on Home/Sleep presses in the base state
pub trait DisplayPower {
    fn is_display_on(&self) -> bool;
}

/// A fixed answer, mostly useful in tests
impl DisplayPower for bool {
    fn is_display_on(&self) -> bool {
        *self
    }
}

/// Display power flag shared between the host and the state machine
#[derive(Debug, Clone)]
pub struct SharedDisplay {
    on: Arc<AtomicBool>,
}

impl SharedDisplay {
    pub fn new(on: bool) -> Self {
        Self {
            on: Arc::new(AtomicBool::new(on)),
        }
    }

    /// Set the display power, logging only actual changes
    pub fn set(&self, on: bool) {
        let was_on = self.on.swap(on, Ordering::SeqCst);
        if was_on != on {
            info!(on, "display power changed");
        }
    }
}

impl DisplayPower for SharedDisplay {
    fn is_display_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

/// Screen manager behaviour: `wake` powers the display on, `sleep` turns
/// it off. Everything else leaves the display alone.
pub struct ScreenPolicy {
    display: SharedDisplay,
}

impl ScreenPolicy {
    pub fn new(display: SharedDisplay) -> Self {
        Self { display }
    }

    pub fn apply(&self, event: HardwareEvent) {
        match event {
            HardwareEvent::Wake => self.display.set(true),
            HardwareEvent::Sleep => self.display.set(false),
            _ => {}
        }
    }
}
