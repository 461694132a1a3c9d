//! ftbar binary - composition root.
//!
//! 1. Parse arguments and load configuration from TOML
//! 2. Initialise tracing
//! 3. Build the toolbar with a logging host bridge
//! 4. Run one of `render`, `click` or `eval`

mod bridge;
mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ftbar_action::ActionDispatcher;
use ftbar_core::config::FtbarConfig;
use ftbar_core::types::ModuleDefinition;
use ftbar_template::Template;
use ftbar_ui::{
    split, to_plain_text, IconCatalog, ItemController, ItemView, MountContext, RenderTrigger,
    Toolbar,
};

use bridge::LoggingBridge;
use cli::{CliArgs, Command, RenderInput};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can apply; a load
    // failure is reported once the subscriber is up.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(FtbarConfig::load(&config_file))
    } else {
        None
    };
    let config_level = match &loaded {
        Some(Ok(config)) => config.general.log_level.clone(),
        _ => String::new(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.resolve_log_level(&config_level))),
        )
        .init();

    let config = match loaded {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config. Using defaults.");
            FtbarConfig::default()
        }
        None => {
            tracing::debug!(path = %config_file.display(), "No config file. Using defaults.");
            FtbarConfig::default()
        }
    };

    match args.command {
        Command::Render { json, input } => {
            let mut toolbar = mounted_toolbar(&config)?;
            let views = render(&mut toolbar, &input);
            print_views(&views, json)?;
        }
        Command::Click { id, input } => {
            let mut toolbar = mounted_toolbar(&config)?;
            render(&mut toolbar, &input);
            let handles = toolbar
                .click(&id)
                .ok_or_else(|| format!("unknown item: {}", id))?;
            tracing::debug!(item = %id, calls = handles.len(), "Waiting for host calls");
            for handle in handles {
                handle.await?;
            }
            if let Some(panel) = toolbar.settings_mut(&id).and_then(|s| s.panel()) {
                println!("{}", serde_json::to_string_pretty(&panel)?);
            }
        }
        Command::Eval { template, vars } => {
            eval(&config, &template, &vars)?;
        }
    }

    Ok(())
}

fn mounted_toolbar(config: &FtbarConfig) -> Result<Toolbar, Box<dyn std::error::Error>> {
    let mut toolbar = Toolbar::from_config(config, Arc::new(LoggingBridge))?;
    toolbar.mount_all()?;
    tracing::info!(items = toolbar.len(), "Toolbar mounted");
    Ok(toolbar)
}

/// Feed the host inputs to every item and return the final views.
fn render(toolbar: &mut Toolbar, input: &RenderInput) -> Vec<ItemView> {
    toolbar.apply(RenderTrigger::FocusChanged(input.window()));
    toolbar.apply(RenderTrigger::ExtraVarsChanged(input.extra_vars()))
}

fn print_views(views: &[ItemView], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(views)?);
        return Ok(());
    }
    for view in views {
        match &view.tooltip {
            Some(tooltip) => println!(
                "{}: {} ({})",
                view.id,
                to_plain_text(&view.content),
                to_plain_text(tooltip)
            ),
            None => println!("{}: {}", view.id, to_plain_text(&view.content)),
        }
    }
    Ok(())
}

/// Evaluate `source` against the scope a freshly mounted item would see.
fn eval(
    config: &FtbarConfig,
    source: &str,
    vars: &[(String, serde_json::Value)],
) -> Result<(), Box<dyn std::error::Error>> {
    let template = Template::compile_with_limits(source, &config.evaluator)?;

    let context = MountContext::new(
        IconCatalog::from_config(&config.icons),
        config.translations.clone(),
        config.evaluator,
    );
    let dispatcher = ActionDispatcher::new(Arc::new(LoggingBridge), config.evaluator);
    let mut item = ItemController::new(ModuleDefinition::new("eval", source), context, dispatcher);
    item.mount()?;
    item.apply(RenderTrigger::ExtraVarsChanged(cli::to_extra_vars(vars)));

    let value = template.evaluate(item.scope(), &config.evaluator)?;
    let icons = item
        .icons()
        .ok_or("icon catalog unavailable after mount")?;
    let tokens = split(&value, icons);
    println!("{}", serde_json::to_string_pretty(&tokens)?);
    Ok(())
}
