//! Quick-settings toolbar item.
//!
//! Clicking the item toggles a panel with an app-settings button, a
//! brightness slider and power buttons. Brightness is queried from the
//! host at mount and again every time the panel opens or closes; a result
//! that arrives after the item was unmounted is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;

use ftbar_action::{fetch_brightness, Brightness, HostCommand};
use ftbar_core::error::FtbarError;

use crate::item::{ItemController, ItemView, RenderTrigger};
use crate::lifecycle::ItemState;
use crate::render::RenderNode;

/// A panel button bound to one host command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelButton {
    pub icon: RenderNode,
    pub label: String,
    pub command: HostCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrightnessSlider {
    pub icon: RenderNode,
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

/// Contents of the open settings panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsPanelView {
    pub title: String,
    pub app_settings: PanelButton,
    pub brightness: Option<BrightnessSlider>,
    pub power: Vec<PanelButton>,
}

const APP_SETTINGS: (&str, &str, HostCommand) = (
    "RiSettings4Fill",
    "settings.app_settings",
    HostCommand::ShowAppSettings,
);

const POWER_BUTTONS: [(&str, &str, HostCommand); 4] = [
    ("BiLogOut", "settings.log_out", HostCommand::LogOut),
    ("BiMoon", "settings.sleep", HostCommand::Suspend),
    ("VscDebugRestart", "settings.restart", HostCommand::Restart),
    ("GrPower", "settings.shutdown", HostCommand::Shutdown),
];

const BRIGHTNESS_ICON: &str = "CiBrightnessUp";

/// Toolbar item that owns the quick-settings panel.
pub struct SettingsModule {
    item: ItemController,
    open: bool,
    brightness: Arc<Mutex<Brightness>>,
}

impl SettingsModule {
    pub fn new(item: ItemController) -> Self {
        Self {
            item,
            open: false,
            brightness: Arc::new(Mutex::new(Brightness {
                min: 0.0,
                max: 0.0,
                current: 0.0,
            })),
        }
    }

    pub fn item(&self) -> &ItemController {
        &self.item
    }

    pub fn item_mut(&mut self) -> &mut ItemController {
        &mut self.item
    }

    pub fn id(&self) -> &str {
        self.item.id()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn brightness(&self) -> Brightness {
        *self.brightness.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mount the item and start the first brightness query.
    pub fn mount(&mut self) -> Result<(), FtbarError> {
        self.item.mount()?;
        // detached; the result lands in the shared slot
        let _ = self.refresh_brightness();
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<(), FtbarError> {
        self.open = false;
        self.item.unmount()
    }

    /// Render the item. It is always clickable and shows as active while
    /// the panel is open.
    pub fn apply(&mut self, trigger: RenderTrigger) -> Option<ItemView> {
        self.item.set_active(self.open);
        self.item.apply(trigger).map(|mut view| {
            view.clickable = true;
            view
        })
    }

    pub fn render(&mut self) -> Option<ItemView> {
        self.apply(RenderTrigger::Refresh)
    }

    /// Toggle the panel, then run the item's own click template.
    pub fn click(&mut self) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = self.set_open(!self.open).into_iter().collect();
        handles.extend(self.item.click());
        handles
    }

    /// Change the panel open state. A change re-queries brightness.
    pub fn set_open(&mut self, open: bool) -> Option<JoinHandle<()>> {
        if self.open == open {
            return None;
        }
        self.open = open;
        tracing::debug!(item = %self.item.id(), open, "Settings panel toggled");
        self.refresh_brightness()
    }

    /// The application lost focus.
    pub fn on_blur(&mut self) -> Option<JoinHandle<()>> {
        self.set_open(false)
    }

    /// Ask the host for the current brightness. Failures are ignored and
    /// results for a stale mount are discarded.
    pub fn refresh_brightness(&self) -> Option<JoinHandle<()>> {
        let ticket = self.item.ticket()?;
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let bridge = Arc::clone(self.item.dispatcher().bridge());
        let slot = Arc::clone(&self.brightness);
        let id = self.item.id().to_string();

        Some(runtime.spawn(async move {
            match fetch_brightness(bridge.as_ref()).await {
                Ok(brightness) if ticket.is_current() => {
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = brightness;
                }
                Ok(_) => {
                    tracing::debug!(item = %id, generation = ticket.generation(), "Dropping stale brightness");
                }
                Err(e) => {
                    tracing::debug!(item = %id, error = %e, "Brightness unavailable");
                }
            }
        }))
    }

    /// Slider moved. Only the local value changes.
    pub fn set_brightness(&self, value: f64) {
        self.brightness
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_current(value);
    }

    /// Run a panel button's command.
    pub fn press(&self, command: HostCommand) -> Option<JoinHandle<()>> {
        if command.is_query() {
            return None;
        }
        self.item
            .dispatcher()
            .send(command, serde_json::Value::Null)
    }

    /// The panel contents, while open and mounted.
    pub fn panel(&self) -> Option<SettingsPanelView> {
        if !self.open || self.item.state() != ItemState::Active {
            return None;
        }
        let icons = self.item.icons()?;
        let translations = self.item.translations();

        let icon_node = |name: &str| RenderNode::Icon {
            name: name.to_string(),
            size: None,
            glyph: icons.glyph(name).unwrap_or(name).to_string(),
        };
        let button = |(icon, key, command): (&str, &str, HostCommand)| PanelButton {
            icon: icon_node(icon),
            label: translations.translate(key),
            command,
        };

        let brightness = self.brightness();
        Some(SettingsPanelView {
            title: translations.translate("settings.title"),
            app_settings: button(APP_SETTINGS),
            brightness: brightness.is_adjustable().then(|| BrightnessSlider {
                icon: icon_node(BRIGHTNESS_ICON),
                min: brightness.min,
                max: brightness.max,
                current: brightness.current,
            }),
            power: POWER_BUTTONS.into_iter().map(button).collect(),
        })
    }
}
