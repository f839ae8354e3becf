mod cli;
mod logging;
mod scene;

use std::path::Path;

use anyhow::{bail, Context, Result};
use lamina_api::LayerList;
use lamina_kernel::{snapshot, ActionRegistry, ContextKey, LaminaConfig, MenuEntry};
use serde_json::json;
use tracing::info;

use crate::cli::{Args, Command};
use crate::logging::setup_logging;
use crate::scene::{summarize, Scene};

fn main() -> Result<()> {
    let args = <Args as clap::Parser>::parse();

    let config = match &args.config {
        Some(path) => LaminaConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LaminaConfig::default(),
    };
    setup_logging(args.verbose, config.log_filter.as_deref());

    let registry = config.registry().context("building action registry")?;
    info!(actions = registry.len(), "registry ready");

    match args.command {
        Command::Check => check(&registry, args.json),
        Command::Context { scene } => {
            let layers = load_scene(&scene)?;
            print_context(&layers, args.json)
        }
        Command::Menu { scene } => {
            let layers = load_scene(&scene)?;
            let menu = registry.menu(&snapshot(&layers))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&menu)?);
            } else {
                print_menu(&menu, 0);
            }
            Ok(())
        }
        Command::Invoke {
            scene,
            action,
            force,
        } => {
            let mut layers = load_scene(&scene)?;
            invoke(&registry, &mut layers, &action, force)?;
            print_layers(&layers, args.json)
        }
    }
}

fn load_scene(path: &Path) -> Result<LayerList> {
    Scene::load(path)?
        .build()
        .with_context(|| format!("building scene {}", path.display()))
}

fn check(registry: &ActionRegistry, json: bool) -> Result<()> {
    if json {
        let actions: serde_json::Map<String, serde_json::Value> = registry
            .actions()
            .map(|(id, descriptor)| (id.to_string(), descriptor.to_spec()))
            .collect();
        let submenus: Vec<_> = registry.submenus().collect();
        let report = json!({ "submenus": submenus, "actions": actions });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} actions in {} submenus registered",
            registry.len(),
            registry.submenus().count()
        );
    }
    Ok(())
}

fn invoke(
    registry: &ActionRegistry,
    layers: &mut LayerList,
    action: &str,
    force: bool,
) -> Result<()> {
    let descriptor = registry
        .get(action)
        .with_context(|| format!("unknown action {}", action))?;
    let resolution = ActionRegistry::resolve_one(descriptor, &snapshot(layers))?;
    if !resolution.enabled && !force {
        bail!("{} is disabled for this scene (use --force to run anyway)", action);
    }
    let changed = registry.invoke(action, layers)?;
    info!(%action, changed = changed.len(), "action applied");
    Ok(())
}

fn print_context(layers: &LayerList, json: bool) -> Result<()> {
    let context = snapshot(layers);
    if json {
        let values: serde_json::Map<String, serde_json::Value> = ContextKey::ALL
            .into_iter()
            .map(|key| -> Result<(String, serde_json::Value)> {
                Ok((key.name().to_string(), serde_json::to_value(context.key(key))?))
            })
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        for key in ContextKey::ALL {
            println!("{} = {}", key, context.key(key));
        }
    }
    Ok(())
}

fn print_menu(entries: &[MenuEntry], depth: usize) {
    let indent = "    ".repeat(depth);
    for entry in entries {
        match entry {
            MenuEntry::Action {
                id,
                description,
                enabled,
            } => {
                let mark = if *enabled { "x" } else { " " };
                println!("{}[{}] {}  ({})", indent, mark, description, id);
            }
            MenuEntry::Submenu {
                description,
                items,
                ..
            } => {
                println!("{}{} >", indent, description);
                print_menu(items, depth + 1);
            }
        }
    }
}

fn print_layers(layers: &LayerList, json: bool) -> Result<()> {
    let summary = summarize(layers);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    for (index, layer) in summary.iter().enumerate() {
        let dtype = layer.dtype.map(|d| d.to_string()).unwrap_or_default();
        let shape = layer
            .shape
            .as_ref()
            .map(|s| format!("{:?}", s))
            .unwrap_or_default();
        let mut flags = Vec::new();
        if layer.active {
            flags.push("active");
        } else if layer.selected {
            flags.push("selected");
        }
        if !layer.visible {
            flags.push("hidden");
        }
        println!(
            "{:>2}  {:<24} {:<7} {:<8} {:<14} {}",
            index,
            layer.name,
            layer.kind.to_string(),
            dtype,
            shape,
            flags.join(",")
        );
    }
    Ok(())
}
