//! Raw button signals
//!
//! A raw signal is one edge of one physical button. The textual form
//! mirrors the host event names (`home-button-press`,
//! `volume-down-button-release`, ...).

use std::str::FromStr;

/// The four fixed hardware buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Home,
    Sleep,
    VolumeUp,
    VolumeDown,
}

impl Button {
    fn name(&self) -> &'static str {
        match self {
            Button::Home => "home",
            Button::Sleep => "sleep",
            Button::VolumeUp => "volume-up",
            Button::VolumeDown => "volume-down",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "home" => Some(Button::Home),
            "sleep" => Some(Button::Sleep),
            "volume-up" => Some(Button::VolumeUp),
            "volume-down" => Some(Button::VolumeDown),
            _ => None,
        }
    }
}

/// Which edge of a button action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Press,
    Release,
}

impl Edge {
    fn name(&self) -> &'static str {
        match self {
            Edge::Press => "press",
            Edge::Release => "release",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "press" => Some(Edge::Press),
            "release" => Some(Edge::Release),
            _ => None,
        }
    }
}

/// One press or release of one button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSignal {
    pub button: Button,
    pub edge: Edge,
}

impl RawSignal {
    #[cfg(test)]
    pub const fn press(button: Button) -> Self {
        Self {
            button,
            edge: Edge::Press,
        }
    }

    #[cfg(test)]
    pub const fn release(button: Button) -> Self {
        Self {
            button,
            edge: Edge::Release,
        }
    }

    pub fn is_release(&self) -> bool {
        self.edge == Edge::Release
    }
}

impl std::fmt::Display for RawSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-button-{}", self.button.name(), self.edge.name())
    }
}

/// Errors produced when parsing a raw signal from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSignalError {
    #[error("unknown button {0:?}")]
    UnknownButton(String),

    #[error("unknown edge {0:?}, expected press or release")]
    UnknownEdge(String),

    #[error("malformed signal {0:?}")]
    Malformed(String),
}

impl FromStr for RawSignal {
    type Err = ParseSignalError;

    /// Accepts `home-button-press` as well as the short `home press`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();

        let (button, edge) = if let Some((button, edge)) = text.split_once("-button-") {
            (button, edge)
        } else {
            let mut parts = text.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(button), Some(edge), None) => (button, edge),
                _ => return Err(ParseSignalError::Malformed(s.trim().to_string())),
            }
        };

        let button = Button::from_name(button)
            .ok_or_else(|| ParseSignalError::UnknownButton(button.to_string()))?;
        let edge =
            Edge::from_name(edge).ok_or_else(|| ParseSignalError::UnknownEdge(edge.to_string()))?;

        Ok(Self { button, edge })
    }
}
