//! Ordered collection of toolbar items built from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;

use ftbar_action::{ActionDispatcher, HostBridge};
use ftbar_core::config::FtbarConfig;
use ftbar_core::error::FtbarError;
use ftbar_core::types::{ModuleDefinition, ModuleKind};
use ftbar_template::TemplateCache;

use crate::icons::IconCatalog;
use crate::item::{ItemController, ItemView, MountContext, RenderTrigger};
use crate::lifecycle::ItemState;
use crate::settings::SettingsModule;

/// One slot on the toolbar.
pub enum ToolbarItem {
    Generic(ItemController),
    Settings(SettingsModule),
}

impl ToolbarItem {
    pub fn id(&self) -> &str {
        match self {
            ToolbarItem::Generic(item) => item.id(),
            ToolbarItem::Settings(settings) => settings.id(),
        }
    }

    pub fn state(&self) -> ItemState {
        self.controller().state()
    }

    pub fn controller(&self) -> &ItemController {
        match self {
            ToolbarItem::Generic(item) => item,
            ToolbarItem::Settings(settings) => settings.item(),
        }
    }

    pub fn controller_mut(&mut self) -> &mut ItemController {
        match self {
            ToolbarItem::Generic(item) => item,
            ToolbarItem::Settings(settings) => settings.item_mut(),
        }
    }

    pub fn mount(&mut self) -> Result<(), FtbarError> {
        match self {
            ToolbarItem::Generic(item) => item.mount(),
            ToolbarItem::Settings(settings) => settings.mount(),
        }
    }

    pub fn unmount(&mut self) -> Result<(), FtbarError> {
        match self {
            ToolbarItem::Generic(item) => item.unmount(),
            ToolbarItem::Settings(settings) => settings.unmount(),
        }
    }

    pub fn apply(&mut self, trigger: RenderTrigger) -> Option<ItemView> {
        match self {
            ToolbarItem::Generic(item) => item.apply(trigger),
            ToolbarItem::Settings(settings) => settings.apply(trigger),
        }
    }

    pub fn click(&mut self) -> Vec<JoinHandle<()>> {
        match self {
            ToolbarItem::Generic(item) => item.click(),
            ToolbarItem::Settings(settings) => settings.click(),
        }
    }
}

pub struct Toolbar {
    items: Vec<ToolbarItem>,
    context: MountContext,
    dispatcher: ActionDispatcher,
    cache: TemplateCache,
}

impl Toolbar {
    pub fn new(context: MountContext, dispatcher: ActionDispatcher) -> Self {
        let cache = TemplateCache::new(context.limits);
        Self {
            items: Vec::new(),
            context,
            dispatcher,
            cache,
        }
    }

    /// Build every configured module in order. The configuration is
    /// validated first.
    pub fn from_config(
        config: &FtbarConfig,
        bridge: Arc<dyn HostBridge>,
    ) -> Result<Self, FtbarError> {
        config.validate()?;
        let context = MountContext::new(
            IconCatalog::from_config(&config.icons),
            config.translations.clone(),
            config.evaluator,
        );
        let dispatcher = ActionDispatcher::new(bridge, config.evaluator);
        let mut toolbar = Self::new(context, dispatcher);
        for definition in &config.modules {
            toolbar.push(definition.clone())?;
        }
        Ok(toolbar)
    }

    /// Use a fixed environment instead of the process environment, for
    /// existing items and items pushed later. Applies from the next mount.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        for item in &mut self.items {
            item.controller_mut().set_env(env.clone());
        }
        self.context.env = Some(env);
        self
    }

    pub fn icons(&self) -> &IconCatalog {
        &self.context.icons
    }

    /// Append an item built from `definition`. Ids must be unique since
    /// clicks and reordering are routed by id.
    pub fn push(&mut self, definition: ModuleDefinition) -> Result<(), FtbarError> {
        if self.get(&definition.id).is_some() {
            return Err(FtbarError::Config(format!(
                "duplicate module id: {}",
                definition.id
            )));
        }
        let kind = definition.kind;
        let item = ItemController::with_cache(
            definition,
            self.context.clone(),
            self.dispatcher.clone(),
            &mut self.cache,
        );
        let item = match kind {
            ModuleKind::Generic => ToolbarItem::Generic(item),
            ModuleKind::Settings => ToolbarItem::Settings(SettingsModule::new(item)),
        };
        tracing::debug!(item = %item.id(), %kind, "Toolbar item added");
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(ToolbarItem::id).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ToolbarItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ToolbarItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn settings_mut(&mut self, id: &str) -> Option<&mut SettingsModule> {
        match self.get_mut(id)? {
            ToolbarItem::Settings(settings) => Some(settings),
            ToolbarItem::Generic(_) => None,
        }
    }

    /// Mount every item that is not mounted yet.
    pub fn mount_all(&mut self) -> Result<(), FtbarError> {
        for item in &mut self.items {
            if item.state() == ItemState::Unmounted {
                item.mount()?;
            }
        }
        Ok(())
    }

    pub fn unmount_all(&mut self) -> Result<(), FtbarError> {
        for item in &mut self.items {
            if item.state() != ItemState::Unmounted {
                item.unmount()?;
            }
        }
        Ok(())
    }

    /// Send a trigger to every item. Items that render nothing are left out.
    pub fn apply(&mut self, trigger: RenderTrigger) -> Vec<ItemView> {
        self.items
            .iter_mut()
            .filter_map(|item| item.apply(trigger.clone()))
            .collect()
    }

    pub fn render_all(&mut self) -> Vec<ItemView> {
        self.apply(RenderTrigger::Refresh)
    }

    /// Click the item with `id`. `None` when no such item exists.
    pub fn click(&mut self, id: &str) -> Option<Vec<JoinHandle<()>>> {
        let item = self.get_mut(id)?;
        Some(item.click())
    }

    /// Forward a key press to the item with `id`.
    pub fn key_down(&self, id: &str, key: &str) -> bool {
        self.get(id)
            .is_some_and(|item| item.controller().key_down(key))
    }

    /// Move the listed ids to the front in the given order. Other items
    /// keep their relative order; unknown ids are ignored.
    pub fn reorder(&mut self, ids: &[&str]) {
        let mut remaining: Vec<Option<ToolbarItem>> = self.items.drain(..).map(Some).collect();
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            let found = remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|item| item.id() == *id));
            if let Some(item) = found.and_then(Option::take) {
                ordered.push(item);
            }
        }
        ordered.extend(remaining.into_iter().flatten());
        self.items = ordered;
    }
}
