//! Per-item controller: owns the scope, runs the render pipeline and wires
//! click and keyboard events.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use ftbar_action::ActionDispatcher;
use ftbar_core::config::EvaluatorConfig;
use ftbar_core::error::FtbarError;
use ftbar_core::types::{ModuleDefinition, Translations, WindowSnapshot};
use ftbar_template::{builtins, Function, Scope, Template, TemplateCache, Value};

use crate::icons::{IconCatalog, IconCatalogView};
use crate::lifecycle::{ItemState, Lifecycle, MountTicket};
use crate::render::{render_value, RenderNode};

/// Caller-supplied variables merged into the scope on every render.
pub type ExtraVars = BTreeMap<String, Value>;

/// Externally supplied click handler, run before the click template.
pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

/// Externally supplied keyboard handler, receives the key name.
pub type KeyHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// A change that requires the item to render again.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderTrigger {
    /// Focus moved; `None` when no window has focus.
    FocusChanged(Option<WindowSnapshot>),
    ExtraVarsChanged(ExtraVars),
    Refresh,
}

/// Everything an item snapshots or reads when it mounts.
#[derive(Debug, Clone)]
pub struct MountContext {
    pub icons: IconCatalog,
    pub translations: Translations,
    pub limits: EvaluatorConfig,
    /// Fixed environment; the process environment is captured when unset.
    pub env: Option<BTreeMap<String, String>>,
}

impl MountContext {
    pub fn new(icons: IconCatalog, translations: Translations, limits: EvaluatorConfig) -> Self {
        Self {
            icons,
            translations,
            limits,
            env: None,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn environment(&self) -> BTreeMap<String, String> {
        match &self.env {
            Some(env) => env.clone(),
            None => std::env::vars().collect(),
        }
    }
}

/// What a mounted item shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: String,
    pub style: BTreeMap<String, String>,
    pub clickable: bool,
    pub active: bool,
    pub content: Vec<RenderNode>,
    pub tooltip: Option<Vec<RenderNode>>,
}

/// Drives one toolbar item from its module definition.
pub struct ItemController {
    definition: ModuleDefinition,
    content: Option<Template>,
    tooltip: Option<Template>,
    on_click: Option<Template>,
    context: MountContext,
    dispatcher: ActionDispatcher,
    lifecycle: Lifecycle,
    scope: Scope,
    icons: Option<IconCatalogView>,
    window: Option<WindowSnapshot>,
    extra_vars: ExtraVars,
    active: bool,
    click_handler: Option<ClickHandler>,
    key_handler: Option<KeyHandler>,
}

impl ItemController {
    pub fn new(definition: ModuleDefinition, context: MountContext, dispatcher: ActionDispatcher) -> Self {
        let mut cache = TemplateCache::new(context.limits);
        Self::with_cache(definition, context, dispatcher, &mut cache)
    }

    /// Build an item, compiling its templates through a shared cache.
    ///
    /// Templates that fail to compile are logged and treated as absent.
    pub fn with_cache(
        definition: ModuleDefinition,
        context: MountContext,
        dispatcher: ActionDispatcher,
        cache: &mut TemplateCache,
    ) -> Self {
        let id = definition.id.clone();
        let mut compile = |source: Option<&str>, role: &str| -> Option<Template> {
            let source = source.filter(|s| !s.trim().is_empty())?;
            match cache.get_or_compile(source) {
                Ok(template) => Some(template),
                Err(e) => {
                    tracing::debug!(item = %id, role, error = %e, "Template will render nothing");
                    None
                }
            }
        };
        let content = compile(Some(definition.template.as_str()), "content");
        let tooltip = compile(definition.tooltip.as_deref(), "tooltip");
        let on_click = compile(definition.on_click.as_deref(), "on_click");

        Self {
            definition,
            content,
            tooltip,
            on_click,
            context,
            dispatcher,
            lifecycle: Lifecycle::new(),
            scope: Scope::new(),
            icons: None,
            window: None,
            extra_vars: ExtraVars::new(),
            active: false,
            click_handler: None,
            key_handler: None,
        }
    }

    pub fn with_click_handler(mut self, handler: ClickHandler) -> Self {
        self.click_handler = Some(handler);
        self
    }

    pub fn with_key_handler(mut self, handler: KeyHandler) -> Self {
        self.key_handler = Some(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    pub fn state(&self) -> ItemState {
        self.lifecycle.current()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn translations(&self) -> &Translations {
        &self.context.translations
    }

    /// The catalog view captured at mount.
    pub fn icons(&self) -> Option<&IconCatalogView> {
        self.icons.as_ref()
    }

    pub fn ticket(&self) -> Option<MountTicket> {
        self.lifecycle.ticket()
    }

    /// Replace the environment captured at the next mount.
    pub fn set_env(&mut self, env: BTreeMap<String, String>) {
        self.context.env = Some(env);
    }

    /// Whether the item is drawn in its highlighted state.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_clickable(&self) -> bool {
        self.definition
            .on_click
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
            || self.click_handler.is_some()
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Seed the scope and become Active.
    pub fn mount(&mut self) -> Result<(), FtbarError> {
        self.lifecycle.transition(ItemState::ScopeSeeding)?;
        let icons = match self.context.icons.snapshot() {
            Ok(view) => view,
            Err(e) => {
                self.lifecycle.transition(ItemState::Unmounted)?;
                return Err(e);
            }
        };

        self.scope.set("icon", icons.scope_value());
        self.scope.set(
            "env",
            Value::object(
                self.context
                    .environment()
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v))),
            ),
        );
        self.scope.set("invoke", builtins::invoke());
        self.icons = Some(icons);
        self.refresh_scope();

        self.lifecycle.transition(ItemState::Active)?;
        tracing::debug!(item = %self.definition.id, mount = ?self.lifecycle.mount_id(), "Item mounted");
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<(), FtbarError> {
        self.lifecycle.transition(ItemState::Unmounted)?;
        self.icons = None;
        tracing::debug!(item = %self.definition.id, "Item unmounted");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------

    /// Store the trigger's input and render.
    pub fn apply(&mut self, trigger: RenderTrigger) -> Option<ItemView> {
        match trigger {
            RenderTrigger::FocusChanged(window) => self.window = window,
            RenderTrigger::ExtraVarsChanged(vars) => self.extra_vars = vars,
            RenderTrigger::Refresh => {}
        }
        self.render()
    }

    /// Evaluate content and tooltip against the current scope. `None` when
    /// not Active or when the content renders to nothing.
    pub fn render(&mut self) -> Option<ItemView> {
        if self.lifecycle.current() != ItemState::Active {
            return None;
        }
        self.refresh_scope();
        let icons = self.icons.as_ref()?;

        let content = self.render_template(self.content.as_ref(), icons, "content");
        if content.is_empty() {
            return None;
        }
        let tooltip = Some(self.render_template(self.tooltip.as_ref(), icons, "tooltip"))
            .filter(|nodes| !nodes.is_empty());

        Some(ItemView {
            id: self.definition.id.clone(),
            style: self.definition.style.clone(),
            clickable: self.is_clickable(),
            active: self.active,
            content,
            tooltip,
        })
    }

    fn render_template(
        &self,
        template: Option<&Template>,
        icons: &IconCatalogView,
        role: &str,
    ) -> Vec<RenderNode> {
        let Some(template) = template else {
            return Vec::new();
        };
        match template.evaluate(&self.scope, &self.context.limits) {
            Ok(value) => render_value(&value, icons),
            Err(e) => {
                tracing::debug!(item = %self.definition.id, role, error = %e, "Evaluation failed");
                Vec::new()
            }
        }
    }

    /// Per-render scope keys: translator, focused window, then extras.
    fn refresh_scope(&mut self) {
        let translations = self.context.translations.clone();
        self.scope.set(
            "t",
            Function::new("t", move |args| {
                let key = args.first().map(Value::to_string).unwrap_or_default();
                Ok(Value::String(translations.translate(&key)))
            }),
        );
        let window = self.window.clone().unwrap_or_else(WindowSnapshot::unfocused);
        self.scope.set("window", window_value(&window));
        for (key, value) in &self.extra_vars {
            self.scope.set(key.clone(), value.clone());
        }
    }

    // -------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------

    /// Run the external click handler, then dispatch the click template
    /// against the current scope.
    pub fn click(&mut self) -> Vec<JoinHandle<()>> {
        if let Some(handler) = &self.click_handler {
            handler();
        }
        if self.lifecycle.current() != ItemState::Active {
            return Vec::new();
        }
        self.refresh_scope();
        self.dispatcher.dispatch(self.on_click.as_ref(), &self.scope)
    }

    /// Forward a key press to the external key handler. Returns whether a
    /// handler was attached.
    pub fn key_down(&self, key: &str) -> bool {
        match &self.key_handler {
            Some(handler) => {
                handler(key);
                true
            }
            None => false,
        }
    }
}

fn window_value(window: &WindowSnapshot) -> Value {
    let mut fields: BTreeMap<String, Value> = window
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
        .collect();
    fields.insert("name".to_string(), Value::from(window.name.as_str()));
    fields.insert("title".to_string(), Value::from(window.title.as_str()));
    Value::Object(Arc::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use ftbar_action::{HostCommand, RecordingBridge};

    fn context() -> MountContext {
        let mut env = BTreeMap::new();
        env.insert("USER".to_string(), "ada".to_string());
        MountContext::new(
            IconCatalog::with_defaults(),
            Translations::new(),
            EvaluatorConfig::default(),
        )
        .with_env(env)
    }

    fn controller(definition: ModuleDefinition) -> (ItemController, Arc<RecordingBridge>) {
        let bridge = Arc::new(RecordingBridge::new());
        let dispatcher = ActionDispatcher::new(bridge.clone(), EvaluatorConfig::default());
        (ItemController::new(definition, context(), dispatcher), bridge)
    }

    fn text(view: &ItemView) -> String {
        crate::render::to_plain_text(&view.content)
    }

    // =========================================================================
    // Mount and render
    // =========================================================================

    #[test]
    fn test_no_render_before_mount() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'hi'"));
        assert_eq!(item.state(), ItemState::Unmounted);
        assert!(item.render().is_none());
    }

    #[test]
    fn test_mount_seeds_reserved_keys() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'hi'"));
        item.mount().unwrap();
        assert_eq!(item.state(), ItemState::Active);
        for key in ["t", "icon", "env", "window", "invoke"] {
            assert!(item.scope().has(key), "missing {}", key);
        }
    }

    #[test]
    fn test_double_mount_is_error() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'hi'"));
        item.mount().unwrap();
        assert!(matches!(item.mount(), Err(FtbarError::Lifecycle(_))));
    }

    #[test]
    fn test_unfocused_window_fallback() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "window.title"));
        item.mount().unwrap();
        let view = item.render().unwrap();
        assert_eq!(text(&view), "No Window Focused");
    }

    #[test]
    fn test_focus_change_rerenders() {
        let (mut item, _) = controller(ModuleDefinition::new(
            "focused",
            "window.name == 'None' ? '' : window.title",
        ));
        item.mount().unwrap();
        assert!(item.render().is_none());

        let view = item
            .apply(RenderTrigger::FocusChanged(Some(WindowSnapshot::new(
                "code", "lib.rs",
            ))))
            .unwrap();
        assert_eq!(text(&view), "lib.rs");

        assert!(item.apply(RenderTrigger::FocusChanged(None)).is_none());
    }

    #[test]
    fn test_window_extra_fields_visible() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "window.pid"));
        item.mount().unwrap();
        let mut window = WindowSnapshot::new("code", "x");
        window.extra.insert("pid".into(), serde_json::json!(42));
        let view = item.apply(RenderTrigger::FocusChanged(Some(window))).unwrap();
        assert_eq!(text(&view), "42");
    }

    #[test]
    fn test_extra_vars_override_reserved_keys() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "window + ' ' + count"));
        item.mount().unwrap();
        let mut vars = ExtraVars::new();
        vars.insert("window".into(), Value::from("mine"));
        vars.insert("count".into(), Value::Number(3.0));
        let view = item.apply(RenderTrigger::ExtraVarsChanged(vars)).unwrap();
        assert_eq!(text(&view), "mine 3");
    }

    #[test]
    fn test_env_and_translation_available() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "t('settings.title') + ':' + env.USER"));
        item.mount().unwrap();
        assert_eq!(text(&item.render().unwrap()), "Settings:ada");
    }

    #[test]
    fn test_icon_content() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "icon.BiMoon + ':16'"));
        item.mount().unwrap();
        let view = item.render().unwrap();
        assert_eq!(
            view.content,
            vec![RenderNode::Icon {
                name: "BiMoon".into(),
                size: Some("16px".into()),
                glyph: "\u{263e}".into(),
            }]
        );
    }

    #[test]
    fn test_undefined_symbol_renders_nothing() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "battery.level"));
        item.mount().unwrap();
        assert!(item.render().is_none());
    }

    #[test]
    fn test_syntax_error_renders_nothing() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "1 +"));
        item.mount().unwrap();
        assert!(item.render().is_none());
    }

    #[test]
    fn test_tooltip_rules() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'x'").with_tooltip("t('settings.sleep')"));
        item.mount().unwrap();
        let view = item.render().unwrap();
        assert_eq!(
            view.tooltip,
            Some(vec![RenderNode::Text {
                content: "Sleep".into()
            }])
        );

        let (mut item, _) = controller(ModuleDefinition::new("a", "'x'").with_tooltip("nope()"));
        item.mount().unwrap();
        assert!(item.render().unwrap().tooltip.is_none());

        let (mut item, _) = controller(ModuleDefinition::new("a", "'x'").with_tooltip("''"));
        item.mount().unwrap();
        assert!(item.render().unwrap().tooltip.is_none());
    }

    #[test]
    fn test_view_carries_style_and_flags() {
        let (mut item, _) = controller(
            ModuleDefinition::new("a", "'x'")
                .with_style("color", "red")
                .with_on_click("invoke('log_out')"),
        );
        item.mount().unwrap();
        item.set_active(true);
        let view = item.render().unwrap();
        assert_eq!(view.id, "a");
        assert_eq!(view.style.get("color").map(String::as_str), Some("red"));
        assert!(view.clickable);
        assert!(view.active);
    }

    #[test]
    fn test_not_clickable_without_action() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'x'"));
        item.mount().unwrap();
        assert!(!item.render().unwrap().clickable);
    }

    #[test]
    fn test_unmount_stops_rendering() {
        let (mut item, _) = controller(ModuleDefinition::new("a", "'x'"));
        item.mount().unwrap();
        item.unmount().unwrap();
        assert!(item.render().is_none());
        item.mount().unwrap();
        assert!(item.render().is_some());
    }

    // =========================================================================
    // Events
    // =========================================================================

    #[tokio::test]
    async fn test_click_dispatches_template() {
        let (mut item, bridge) = controller(
            ModuleDefinition::new("a", "'x'").with_on_click("invoke('suspend')"),
        );
        item.mount().unwrap();
        for handle in item.click() {
            handle.await.unwrap();
        }
        assert_eq!(bridge.commands(), vec![HostCommand::Suspend]);
    }

    #[tokio::test]
    async fn test_click_uses_current_scope() {
        let (mut item, bridge) = controller(
            ModuleDefinition::new("a", "'x'")
                .with_on_click("window.name == 'code' ? invoke('restart') : invoke('shutdown')"),
        );
        item.mount().unwrap();
        item.apply(RenderTrigger::FocusChanged(Some(WindowSnapshot::new("code", "t"))));
        for handle in item.click() {
            handle.await.unwrap();
        }
        assert_eq!(bridge.commands(), vec![HostCommand::Restart]);
    }

    #[tokio::test]
    async fn test_external_handler_runs_before_template() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let handler_order = order.clone();
        let bridge = Arc::new(RecordingBridge::new());
        let dispatcher = ActionDispatcher::new(bridge.clone(), EvaluatorConfig::default());

        // the template reads a counter the handler bumps
        let seen = Arc::new(AtomicUsize::new(0));
        let handler_seen = seen.clone();
        let probe_seen = seen.clone();
        let probe_order = order.clone();

        let mut item = ItemController::new(
            ModuleDefinition::new("a", "'x'").with_on_click("probe()"),
            context(),
            dispatcher,
        )
        .with_click_handler(Arc::new(move || {
            handler_seen.fetch_add(1, Ordering::SeqCst);
            handler_order.lock().unwrap().push("handler");
        }));
        item.mount().unwrap();

        let mut vars = ExtraVars::new();
        vars.insert(
            "probe".into(),
            Value::Function(Function::new("probe", move |_| {
                probe_order.lock().unwrap().push("template");
                Ok(Value::Number(probe_seen.load(Ordering::SeqCst) as f64))
            })),
        );
        item.apply(RenderTrigger::ExtraVarsChanged(vars));

        assert!(item.click().is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["handler", "template"]);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(bridge.commands().is_empty());
    }

    #[test]
    fn test_click_without_template_is_noop() {
        let (mut item, bridge) = controller(ModuleDefinition::new("a", "'x'"));
        item.mount().unwrap();
        assert!(item.click().is_empty());
        assert!(bridge.commands().is_empty());
    }

    #[test]
    fn test_key_down_forwarded() {
        let keys = Arc::new(Mutex::new(Vec::new()));
        let sink = keys.clone();
        let bridge = Arc::new(RecordingBridge::new());
        let (plain, _) = controller(ModuleDefinition::new("a", "'x'"));
        assert!(!plain.key_down("Enter"));

        let item = ItemController::new(
            ModuleDefinition::new("a", "'x'"),
            context(),
            ActionDispatcher::new(bridge, EvaluatorConfig::default()),
        )
        .with_key_handler(Arc::new(move |key: &str| sink.lock().unwrap().push(key.to_string())));
        assert!(item.key_down("Enter"));
        assert_eq!(*keys.lock().unwrap(), vec!["Enter".to_string()]);
    }
}
