use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, ValueEnum};
use scene_inspector_rs::config::InspectorConfig;
use scene_inspector_rs::context::{CancelledError, Canceller, Context};
use scene_inspector_rs::inspector::EditTarget;
use scene_inspector_rs::name::string_to_names;
use scene_inspector_rs::path::{Contexts, InspectionPath};
use scene_inspector_rs::registry::init_global;
use scene_inspector_rs::scene::{MemoryScene, SceneHandle, SwitchScene, INPUT_INDEX_VARIABLE};
use scene_inspector_rs::tooling::dump::{dump_tree, render_text, DumpOptions};
use scene_inspector_rs::tooling::logging::log_info;
use serde_json::json;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "scene-inspect")]
#[command(about = "Browse and compare derived facts about a scene location")]
struct CliOptions {
    /// Scene description to inspect (YAML or JSON)
    #[arg(long = "scene", short = 's')]
    scene: PathBuf,

    /// Second scene to compare against as side B
    #[arg(long = "compare")]
    compare: Option<PathBuf>,

    /// Location to inspect under `/Selection`
    #[arg(long = "location", short = 'l')]
    location: Option<String>,

    /// Location used for side B (defaults to --location)
    #[arg(long = "compare-location")]
    compare_location: Option<String>,

    /// Inspection path to start from
    #[arg(long = "root", default_value = "/")]
    root: String,

    /// Configuration file (TOML)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Name reported as the edit target of every inspection
    #[arg(long = "edit-target")]
    edit_target: Option<String>,

    /// Maximum depth below --root
    #[arg(long = "depth")]
    depth: Option<usize>,

    #[arg(long = "format", value_enum, default_value = "text")]
    format: Format,
}

fn main() {
    if let Err(err) = run() {
        if err.is::<CancelledError>() {
            eprintln!("Cancelled");
            process::exit(130);
        }
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn load_scene(path: &Path) -> Result<SceneHandle> {
    let scene = MemoryScene::load(path)
        .with_context(|| format!("Unable to load scene {}", path.display()))?;
    Ok(Arc::new(scene))
}

fn run() -> Result<()> {
    let opts = CliOptions::parse();

    let config = match &opts.config {
        Some(path) => InspectorConfig::load(path)?,
        None => InspectorConfig::load_default()?,
    };
    let registry = init_global(&config)?;

    let primary = load_scene(&opts.scene)?;
    let (scene, mut context_b) = match &opts.compare {
        Some(path) => {
            let secondary = load_scene(path)?;
            let switch: SceneHandle = Arc::new(SwitchScene::new(vec![primary, secondary]));
            (switch, Some(Context::new().with(INPUT_INDEX_VARIABLE, 1)))
        }
        None => (primary, None),
    };

    let mut context_a = Context::new().with(INPUT_INDEX_VARIABLE, 0);
    if let Some(location) = &opts.location {
        context_a.set_scene_path(&string_to_names(location));
    }
    if context_b.is_none() && opts.compare_location.is_some() {
        context_b = Some(context_a.clone());
    }
    let location_b = opts.compare_location.as_ref().or(opts.location.as_ref());
    if let (Some(context), Some(location)) = (context_b.as_mut(), location_b) {
        context.set_scene_path(&string_to_names(location));
    }
    let contexts = match context_b {
        Some(context_b) => Contexts::pair(context_a, context_b),
        None => Contexts::single(context_a),
    };

    let edit_target = opts
        .edit_target
        .as_deref()
        .map(EditTarget::named)
        .unwrap_or_default();
    let path = InspectionPath::with_registry(
        registry.clone(),
        scene,
        contexts,
        edit_target,
        string_to_names(&opts.root),
    );

    let canceller = Canceller::new();
    {
        let canceller = canceller.clone();
        ctrlc::set_handler(move || canceller.cancel())?;
    }

    log_info(
        "inspecting scene",
        Some(json!({
            "scene": opts.scene.display().to_string(),
            "root": path.to_string(),
            "diff": path.is_diff(),
        })),
        None,
    );
    let report = dump_tree(
        &path,
        &canceller,
        &DumpOptions {
            max_depth: opts.depth,
        },
    )?;

    match opts.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print!("{}", render_text(&report)),
    }
    Ok(())
}
