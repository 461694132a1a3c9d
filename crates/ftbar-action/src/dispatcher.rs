//! Click-template dispatch.
//!
//! A click template is evaluated against the item's current scope; every
//! effect in the result is sent to the host as its own fire-and-forget
//! task. Nothing is retried and no failure reaches the caller.

use std::sync::Arc;

use ftbar_core::config::EvaluatorConfig;
use ftbar_template::{Effect, Scope, Template, Value};
use tokio::task::JoinHandle;

use crate::bridge::HostBridge;
use crate::types::HostCommand;

/// Evaluates click templates and forwards their effects to the host.
#[derive(Clone)]
pub struct ActionDispatcher {
    bridge: Arc<dyn HostBridge>,
    limits: EvaluatorConfig,
}

impl ActionDispatcher {
    pub fn new(bridge: Arc<dyn HostBridge>, limits: EvaluatorConfig) -> Self {
        Self { bridge, limits }
    }

    pub fn bridge(&self) -> &Arc<dyn HostBridge> {
        &self.bridge
    }

    /// Effects carried by an evaluated click template: the value itself, or
    /// the effect elements of an array, in order.
    pub fn collect_effects(value: &Value) -> Vec<Effect> {
        match value {
            Value::Effect(effect) => vec![effect.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Effect(effect) => Some(effect.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Evaluate `template` against `scope` and send its effects.
    ///
    /// Returns one handle per spawned host call; callers may drop them.
    pub fn dispatch(&self, template: Option<&Template>, scope: &Scope) -> Vec<JoinHandle<()>> {
        let Some(template) = template else {
            return Vec::new();
        };
        let value = match template.evaluate(scope, &self.limits) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(template = template.source(), error = %e, "Click template failed");
                return Vec::new();
            }
        };

        let effects = Self::collect_effects(&value);
        if effects.is_empty() {
            tracing::debug!(template = template.source(), result = %value, "Click produced no effects");
        }
        effects
            .into_iter()
            .filter_map(|effect| self.execute(effect))
            .collect()
    }

    /// Parse an effect's command and send it. Unknown commands are skipped.
    pub fn execute(&self, effect: Effect) -> Option<JoinHandle<()>> {
        match effect.command.parse::<HostCommand>() {
            Ok(command) => self.send(command, effect.args),
            Err(e) => {
                tracing::warn!(command = %effect.command, error = %e, "Skipping effect");
                None
            }
        }
    }

    /// Spawn a host call and log its failure. Returns `None` when called
    /// outside a tokio runtime.
    pub fn send(&self, command: HostCommand, args: serde_json::Value) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(%command, "No async runtime, host call dropped");
                return None;
            }
        };
        let bridge = Arc::clone(&self.bridge);
        tracing::debug!(%command, "Dispatching host call");
        Some(runtime.spawn(async move {
            if let Err(e) = bridge.invoke(command, args).await {
                tracing::warn!(%command, error = %e, "Host call failed");
            }
        }))
    }
}
