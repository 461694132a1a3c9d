use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FtbarError, Result};
use crate::types::{ModuleDefinition, ModuleKind, Translations};

/// Top-level configuration for the ftbar application.
///
/// Loaded from `~/.ftbar/config.toml` by default. Modules are listed in
/// toolbar order as a `[[modules]]` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtbarConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    /// Extra icons registered on top of the built-in catalog (name -> glyph).
    #[serde(default)]
    pub icons: BTreeMap<String, String>,
    #[serde(default)]
    pub translations: Translations,
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleDefinition>,
}

impl Default for FtbarConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            evaluator: EvaluatorConfig::default(),
            icons: BTreeMap::new(),
            translations: Translations::default(),
            modules: default_modules(),
        }
    }
}

impl FtbarConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FtbarConfig = toml::from_str(&content)?;
        config.validate()?;
        info!(
            modules = config.modules.len(),
            "Configuration loaded from {}",
            path.display()
        );
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject configurations the toolbar cannot be built from.
    ///
    /// Module ids must be non-empty and unique since clicks and reordering
    /// are routed by id.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if module.id.trim().is_empty() {
                return Err(FtbarError::Config("module id must not be empty".into()));
            }
            if !seen.insert(module.id.as_str()) {
                return Err(FtbarError::Config(format!(
                    "duplicate module id: {}",
                    module.id
                )));
            }
        }
        if self.evaluator.max_steps == 0 || self.evaluator.max_depth == 0 {
            return Err(FtbarError::Config(
                "evaluator limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Limits applied to every template evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Maximum number of expression nodes evaluated per template run.
    pub max_steps: u64,
    /// Maximum expression nesting depth (parse and evaluation).
    pub max_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_depth: 64,
        }
    }
}

fn default_modules() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition::new(
            "focused-window",
            "window.name == 'None' ? '' : window.title",
        )
        .with_tooltip("window.name"),
        ModuleDefinition::new("settings", "icon.RiSettings4Fill")
            .with_tooltip("t('settings.title')")
            .with_kind(ModuleKind::Settings),
    ]
}
