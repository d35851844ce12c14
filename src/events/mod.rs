//! High-level button events
//!
//! These are the only things the state machine ever publishes. They carry
//! no payload; listeners subscribe to the broadcast channel the machine
//! was created with.

use serde::{Deserialize, Serialize};

/// Events emitted by the button state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HardwareEvent {
    /// Home pressed and released before the hold threshold
    Home,

    /// Home held past the hold threshold
    HoldHome,

    /// Sleep pressed and released before the hold threshold
    Sleep,

    /// Home or Sleep pressed while the display was off
    Wake,

    /// Sleep held past the hold threshold
    HoldSleep,

    /// Volume up tapped, or one autorepeat tick
    VolumeUp,

    /// Volume down tapped, or one autorepeat tick
    VolumeDown,

    /// Home and Sleep pressed together
    #[serde(rename = "home+sleep")]
    HomeSleep,

    /// Home and a volume button pressed together
    #[serde(rename = "home+volume")]
    HomeVolume,
}

impl HardwareEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            HardwareEvent::Home => "home",
            HardwareEvent::HoldHome => "holdhome",
            HardwareEvent::Sleep => "sleep",
            HardwareEvent::Wake => "wake",
            HardwareEvent::HoldSleep => "holdsleep",
            HardwareEvent::VolumeUp => "volumeup",
            HardwareEvent::VolumeDown => "volumedown",
            HardwareEvent::HomeSleep => "home+sleep",
            HardwareEvent::HomeVolume => "home+volume",
        }
    }
}

impl std::fmt::Display for HardwareEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
