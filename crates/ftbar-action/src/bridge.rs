//! The seam between the toolbar and the host application.
//!
//! The host owns the real implementations (power management, monitor
//! control, the settings window). The toolbar only knows the call contract.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ActionError;
use crate::types::{Brightness, HostCommand};

/// Asynchronous host call interface.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Run a command. Commands without a meaningful result return
    /// `serde_json::Value::Null`.
    async fn invoke(
        &self,
        command: HostCommand,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ActionError>;
}

/// Query the main monitor brightness.
pub async fn fetch_brightness(bridge: &dyn HostBridge) -> Result<Brightness, ActionError> {
    let command = HostCommand::GetMainMonitorBrightness;
    let response = bridge.invoke(command, serde_json::Value::Null).await?;
    serde_json::from_value(response).map_err(|e| ActionError::InvalidResponse {
        command,
        message: e.to_string(),
    })
}

/// In-memory bridge that records every call and answers brightness
/// queries from a fixed value. Used by tests and dry runs.
#[derive(Default)]
pub struct RecordingBridge {
    calls: Mutex<Vec<(HostCommand, serde_json::Value)>>,
    brightness: Mutex<Option<Brightness>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brightness(brightness: Brightness) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            brightness: Mutex::new(Some(brightness)),
        }
    }

    pub fn set_brightness(&self, brightness: Option<Brightness>) {
        if let Ok(mut slot) = self.brightness.lock() {
            *slot = brightness;
        }
    }

    /// Commands received so far, in call order.
    pub fn commands(&self) -> Vec<HostCommand> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(c, _)| *c).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<(HostCommand, serde_json::Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HostBridge for RecordingBridge {
    async fn invoke(
        &self,
        command: HostCommand,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ActionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command, args));
        }
        if command != HostCommand::GetMainMonitorBrightness {
            return Ok(serde_json::Value::Null);
        }
        let brightness = self.brightness.lock().ok().and_then(|b| *b);
        match brightness {
            Some(b) => serde_json::to_value(b).map_err(|e| ActionError::InvalidResponse {
                command,
                message: e.to_string(),
            }),
            None => Err(ActionError::Unsupported(command)),
        }
    }
}
