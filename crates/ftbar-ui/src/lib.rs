//! Toolbar items for ftbar.
//!
//! Each item evaluates its templates against a per-item scope, splits the
//! result into text and icon tokens and renders them. Items are mounted and
//! unmounted through a small state machine: Unmounted -> ScopeSeeding ->
//! Active -> Unmounted. Clicks go through the action dispatcher.

pub mod icons;
pub mod item;
pub mod lifecycle;
pub mod render;
pub mod settings;
pub mod tokens;
pub mod toolbar;

pub use icons::{IconCatalog, IconCatalogView, DEFAULT_ICONS};
pub use item::{ExtraVars, ItemController, ItemView, MountContext, RenderTrigger};
pub use lifecycle::{ItemState, Lifecycle, MountTicket};
pub use render::{render_value, to_plain_text, RenderNode};
pub use settings::{SettingsModule, SettingsPanelView};
pub use tokens::{split, split_str, Token};
pub use toolbar::{Toolbar, ToolbarItem};
