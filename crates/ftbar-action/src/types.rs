//! Host commands and their payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActionError;

/// Commands the toolbar may ask the host to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    ShowAppSettings,
    LogOut,
    Suspend,
    Restart,
    Shutdown,
    GetMainMonitorBrightness,
}

impl HostCommand {
    pub const ALL: [HostCommand; 6] = [
        HostCommand::ShowAppSettings,
        HostCommand::LogOut,
        HostCommand::Suspend,
        HostCommand::Restart,
        HostCommand::Shutdown,
        HostCommand::GetMainMonitorBrightness,
    ];

    /// Whether the command returns data the caller reads.
    pub fn is_query(&self) -> bool {
        matches!(self, HostCommand::GetMainMonitorBrightness)
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::ShowAppSettings => write!(f, "show_app_settings"),
            HostCommand::LogOut => write!(f, "log_out"),
            HostCommand::Suspend => write!(f, "suspend"),
            HostCommand::Restart => write!(f, "restart"),
            HostCommand::Shutdown => write!(f, "shutdown"),
            HostCommand::GetMainMonitorBrightness => write!(f, "get_main_monitor_brightness"),
        }
    }
}

impl std::str::FromStr for HostCommand {
    type Err = ActionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show_app_settings" => Ok(HostCommand::ShowAppSettings),
            "log_out" => Ok(HostCommand::LogOut),
            "suspend" => Ok(HostCommand::Suspend),
            "restart" => Ok(HostCommand::Restart),
            "shutdown" => Ok(HostCommand::Shutdown),
            "get_main_monitor_brightness" => Ok(HostCommand::GetMainMonitorBrightness),
            _ => Err(ActionError::UnknownCommand(s.to_string())),
        }
    }
}

/// Main monitor brightness as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brightness {
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

impl Brightness {
    /// A slider is only meaningful when the host reports a positive maximum.
    pub fn is_adjustable(&self) -> bool {
        self.max > 0.0
    }

    /// Move `current`, clamped to `[min, max]`.
    pub fn set_current(&mut self, value: f64) {
        self.current = value.max(self.min).min(self.max);
    }
}
