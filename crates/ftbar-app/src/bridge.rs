//! Host bridge used by the command-line binary.
//!
//! There is no desktop shell behind the CLI, so commands are logged rather
//! than executed and queries report themselves as unsupported.

use async_trait::async_trait;
use ftbar_action::{ActionError, HostBridge, HostCommand};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBridge;

#[async_trait]
impl HostBridge for LoggingBridge {
    async fn invoke(
        &self,
        command: HostCommand,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ActionError> {
        if command.is_query() {
            return Err(ActionError::Unsupported(command));
        }
        tracing::info!(%command, %args, "Host command");
        Ok(serde_json::Value::Null)
    }
}
