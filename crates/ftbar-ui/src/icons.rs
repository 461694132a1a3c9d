//! Icon catalog shared by every toolbar item.
//!
//! The catalog is process-wide and may grow while the toolbar runs. Items
//! never read it directly: at mount they take an [`IconCatalogView`], an
//! immutable snapshot that also carries the compiled name pattern and the
//! `icon` scope value.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use ftbar_core::error::FtbarError;
use ftbar_template::Value;
use regex::Regex;

/// Icons the settings panel depends on.
pub const DEFAULT_ICONS: &[(&str, &str)] = &[
    ("RiSettings4Fill", "\u{2699}"),
    ("CiBrightnessUp", "\u{2600}"),
    ("BiLogOut", "\u{21e5}"),
    ("BiMoon", "\u{263e}"),
    ("VscDebugRestart", "\u{21bb}"),
    ("GrPower", "\u{23fb}"),
];

static ICON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("Invalid icon name regex"));

#[derive(Debug, Default)]
struct CatalogState {
    glyphs: BTreeMap<String, String>,
    // Rebuilt lazily after a registration.
    view: Option<IconCatalogView>,
}

/// Registry of icon names and their glyphs.
#[derive(Debug, Clone, Default)]
pub struct IconCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl IconCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding [`DEFAULT_ICONS`].
    pub fn with_defaults() -> Self {
        let catalog = Self::new();
        for (name, glyph) in DEFAULT_ICONS {
            // names in the default table are valid
            let _ = catalog.register(*name, *glyph);
        }
        catalog
    }

    /// Defaults plus the `[icons]` table from configuration. Invalid names
    /// are logged and skipped.
    pub fn from_config(icons: &BTreeMap<String, String>) -> Self {
        let catalog = Self::with_defaults();
        for (name, glyph) in icons {
            if let Err(e) = catalog.register(name.as_str(), glyph.as_str()) {
                tracing::warn!(icon = %name, error = %e, "Skipping configured icon");
            }
        }
        catalog
    }

    /// Add or replace an icon.
    pub fn register(&self, name: impl Into<String>, glyph: impl Into<String>) -> Result<(), FtbarError> {
        let name = name.into();
        if !ICON_NAME.is_match(&name) {
            return Err(FtbarError::Config(format!("invalid icon name: {:?}", name)));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.glyphs.insert(name, glyph.into());
        state.view = None;
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.read(|state| state.glyphs.contains_key(name))
    }

    pub fn glyph(&self, name: &str) -> Option<String> {
        self.read(|state| state.glyphs.get(name).cloned())
    }

    pub fn names(&self) -> Vec<String> {
        self.read(|state| state.glyphs.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.read(|state| state.glyphs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only view of the catalog as it is now. Later registrations do
    /// not affect views already handed out.
    pub fn snapshot(&self) -> Result<IconCatalogView, FtbarError> {
        if let Some(view) = self.read(|state| state.view.clone()) {
            return Ok(view);
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(view) = &state.view {
            return Ok(view.clone());
        }
        let view = IconCatalogView::build(state.glyphs.clone())?;
        state.view = Some(view.clone());
        Ok(view)
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}

/// Immutable snapshot of the icon catalog.
#[derive(Debug, Clone)]
pub struct IconCatalogView {
    glyphs: Arc<BTreeMap<String, String>>,
    pattern: Option<Arc<Regex>>,
    value: Value,
}

impl IconCatalogView {
    fn build(glyphs: BTreeMap<String, String>) -> Result<Self, FtbarError> {
        let pattern = if glyphs.is_empty() {
            None
        } else {
            // longest first so `IconAB` wins over `IconA`
            let mut names: Vec<&str> = glyphs.keys().map(String::as_str).collect();
            names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            let source = format!(r"\b(?P<name>{})(?::(?P<size>[0-9]+))?\b", alternation);
            let regex = Regex::new(&source)
                .map_err(|e| FtbarError::Config(format!("icon pattern: {}", e)))?;
            Some(Arc::new(regex))
        };
        // `icon.Name` evaluates to the name itself, which the splitter
        // turns back into an icon token.
        let value = Value::object(
            glyphs
                .keys()
                .map(|name| (name.clone(), Value::String(name.clone()))),
        );
        Ok(Self {
            glyphs: Arc::new(glyphs),
            pattern,
            value,
        })
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    pub fn glyph(&self, name: &str) -> Option<&str> {
        self.glyphs.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.glyphs.keys().map(String::as_str)
    }

    /// Matches a registered name, optionally followed by `:digits`.
    /// `None` when the catalog is empty.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_deref()
    }

    /// The value bound to `icon` in item scopes.
    pub fn scope_value(&self) -> Value {
        self.value.clone()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
