//! CLI argument definitions for the ftbar binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ftbar_core::types::WindowSnapshot;
use ftbar_template::Value;
use ftbar_ui::ExtraVars;

/// ftbar - templated toolbar items rendered from a TOML configuration.
#[derive(Parser, Debug)]
#[command(name = "ftbar", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount every configured item and print what it renders.
    Render {
        /// Print the item views as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        input: RenderInput,
    },
    /// Click an item and wait for the host calls it triggers.
    Click {
        /// Item id as configured in `[[modules]]`.
        id: String,

        #[command(flatten)]
        input: RenderInput,
    },
    /// Evaluate a single template and print its tokens.
    Eval {
        template: String,

        /// Extra scope variable; the value is parsed as JSON, else taken as a string.
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, serde_json::Value)>,
    },
}

/// Host inputs shared by `render` and `click`.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderInput {
    /// Name of the focused window. Without a name or title no window has focus.
    #[arg(long = "window-name")]
    pub window_name: Option<String>,

    /// Title of the focused window.
    #[arg(long = "window-title")]
    pub window_title: Option<String>,

    /// Extra scope variable; the value is parsed as JSON, else taken as a string.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, serde_json::Value)>,
}

impl RenderInput {
    pub fn window(&self) -> Option<WindowSnapshot> {
        if self.window_name.is_none() && self.window_title.is_none() {
            return None;
        }
        Some(WindowSnapshot::new(
            self.window_name.clone().unwrap_or_default(),
            self.window_title.clone().unwrap_or_default(),
        ))
    }

    pub fn extra_vars(&self) -> ExtraVars {
        to_extra_vars(&self.vars)
    }
}

pub fn to_extra_vars(vars: &[(String, serde_json::Value)]) -> ExtraVars {
    vars.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
        .collect::<BTreeMap<_, _>>()
}

/// Parse `KEY=VALUE`.
pub fn parse_var(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in {:?}", s));
    }
    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > FTBAR_CONFIG env var > ~/.ftbar/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("FTBAR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > config file value > info.
    /// `RUST_LOG` is checked before this when the subscriber is built.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        if !config_level.trim().is_empty() {
            return config_level.to_string();
        }
        "info".to_string()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ftbar").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ftbar").join("config.toml");
    }
    PathBuf::from("config.toml")
}
