use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Which controller a toolbar module is built with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Plain templated item.
    #[default]
    Generic,
    /// Templated item that also owns the quick-settings panel.
    Settings,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::Generic => write!(f, "generic"),
            ModuleKind::Settings => write!(f, "settings"),
        }
    }
}

// =============================================================================
// Module definitions
// =============================================================================

/// A user-authored toolbar item definition.
///
/// Immutable once handed to an item controller. `template`, `tooltip` and
/// `on_click` are expression strings evaluated against the item's scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Stable identity used for ordering and click routing.
    pub id: String,
    #[serde(default)]
    pub kind: ModuleKind,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(
        default,
        alias = "onClick",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_click: Option<String>,
    /// Presentation properties passed through to the host untouched.
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

impl ModuleDefinition {
    /// A generic module with only a content template.
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ModuleKind::Generic,
            template: template.into(),
            tooltip: None,
            on_click: None,
            style: BTreeMap::new(),
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_on_click(mut self, on_click: impl Into<String>) -> Self {
        self.on_click = Some(on_click.into());
        self
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Host snapshots
// =============================================================================

/// Snapshot of the focused window as reported by the host.
///
/// Hosts may attach arbitrary additional fields; they are kept in `extra`
/// and exposed to templates alongside `name` and `title`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub name: String,
    pub title: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WindowSnapshot {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// The snapshot used when no window has focus.
    pub fn unfocused() -> Self {
        Self::new("None", "No Window Focused")
    }
}

// =============================================================================
// Translations
// =============================================================================

/// English strings for the keys the settings panel asks for.
const BUILTIN_TRANSLATIONS: &[(&str, &str)] = &[
    ("settings.title", "Settings"),
    ("settings.app_settings", "App Settings"),
    ("settings.log_out", "Log Out"),
    ("settings.sleep", "Sleep"),
    ("settings.restart", "Restart"),
    ("settings.shutdown", "Shut Down"),
];

/// Key to string lookup backing the `t` template function.
///
/// Lookup order: configured entries, then the built-in English strings,
/// then the key itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(pub BTreeMap<String, String>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn translate(&self, key: &str) -> String {
        if let Some(value) = self.0.get(key) {
            return value.clone();
        }
        BUILTIN_TRANSLATIONS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}
