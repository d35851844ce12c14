//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{bail, Result};

/// Environment variable holding the initial display state (`on`/`off`)
const DISPLAY_VAR: &str = "HWBUTTONS_DISPLAY";
/// Environment variable naming a file of console lines to replay
const INPUT_VAR: &str = "HWBUTTONS_INPUT";

/// Daemon configuration
///
/// Button timing is fixed policy and deliberately absent here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the display is on at startup
    pub display_on: bool,

    /// Read console input from this file instead of stdin
    pub input_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_values(
            std::env::var(DISPLAY_VAR).ok().as_deref(),
            std::env::var_os(INPUT_VAR).map(PathBuf::from),
        )
    }

    fn from_values(display: Option<&str>, input_path: Option<PathBuf>) -> Result<Self> {
        let display_on = match display.map(|value| value.trim().to_ascii_lowercase()) {
            None => true,
            Some(value) if value == "on" => true,
            Some(value) if value == "off" => false,
            Some(value) => bail!("{DISPLAY_VAR} must be \"on\" or \"off\", got {value:?}"),
        };

        let input_path = input_path.filter(|path| !path.as_os_str().is_empty());

        Ok(Self {
            display_on,
            input_path,
        })
    }
}
