use anyhow::{Context, Result, bail};
use chainfx::audio::engine::{Engine, EngineHandle};
use chainfx::audio::{offline, wav};
use chainfx::fx::order::{DspOrder, StageKind};
use chainfx::fx::stages::ProcessSpec;
use chainfx::params::{ParamSpec, ParameterSet};
use chainfx::preset::{Manager, Preset};
use chainfx::settings::Settings;
use clap::Parser;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(debug_assertions)]
#[global_allocator]
static ALLOCATOR: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser, Debug)]
#[command(name = "chainfx")]
#[command(version)]
#[command(about = "Render a WAV file through a reorderable effects chain.")]
struct Args {
    #[arg(help = "Input WAV file", required_unless_present = "list_params")]
    input: Option<PathBuf>,

    #[arg(short, long, help = "Output WAV file (default: timestamped name in --output-dir)")]
    output: Option<PathBuf>,

    #[arg(
        long,
        env = "CHAINFX_OUTPUT_DIR",
        default_value = "./renders",
        help = "Directory for timestamped output files"
    )]
    output_dir: PathBuf,

    #[arg(long, help = "Stage order, e.g. chorus,phaser,ladder,overdrive,filter")]
    order: Option<DspOrder>,

    #[arg(long, value_delimiter = ',', help = "Stages to bypass, e.g. chorus,phaser")]
    bypass: Vec<StageKind>,

    #[arg(long = "set", value_name = "ID=VALUE", help = "Override a parameter by its id")]
    overrides: Vec<String>,

    #[arg(long, help = "Load a preset by name from the preset directory")]
    preset: Option<String>,

    #[arg(long, help = "Load a preset from a file")]
    preset_file: Option<PathBuf>,

    #[arg(long, help = "Save the resulting state as a preset with this name")]
    save_preset: Option<String>,

    #[arg(long, requires = "save_preset", help = "Description stored with --save-preset")]
    preset_description: Option<String>,

    #[arg(long, env = "CHAINFX_PRESET_DIR", help = "Preset directory (default from settings)")]
    preset_dir: Option<PathBuf>,

    #[arg(long, help = "Frames per processing block (default from settings)")]
    block_size: Option<usize>,

    #[arg(long, help = "Parameter smoothing ramp in milliseconds, 0 disables")]
    smoothing_ms: Option<f32>,

    #[arg(long, help = "List all parameters with their ranges and exit")]
    list_params: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    info!("chainfx v{}", env!("CARGO_PKG_VERSION"));
    debug!("Args: {args:?}");

    let mut settings = Settings::load().context("failed to load settings")?;
    if let Some(block_size) = args.block_size {
        settings.audio.block_size = block_size;
    }
    if let Some(ms) = args.smoothing_ms {
        settings.engine.param_smoothing_ms = ms;
    }
    debug!("Settings: {settings}");

    let params = Arc::new(ParameterSet::new());

    if args.list_params {
        list_params(&params);
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        bail!("no input file given");
    };

    let preset_dir = args
        .preset_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.preset_dir));

    let (mut engine, mut handle) = Engine::new(
        Arc::clone(&params),
        settings.engine_config().context("invalid engine settings")?,
    );

    load_presets(&args, &preset_dir, &mut handle)?;

    if let Some(order) = args.order {
        info!("Using order: {order}");
        handle.push_order(order);
    }

    for kind in &args.bypass {
        params.set_bypassed(*kind, true);
    }

    for assignment in &args.overrides {
        apply_override(&params, assignment)?;
    }

    let data = wav::read(input)?;
    if data.channels == 0 {
        bail!("{} has no audio channels", input.display());
    }
    info!(
        "Rendering {} ({} frames, {} Hz, {} channel(s))",
        input.display(),
        data.frames(),
        data.sample_rate,
        data.channels
    );

    // The file decides rate and channel count, settings decide the block size
    let spec = ProcessSpec {
        sample_rate: data.sample_rate as f32,
        num_channels: data.channels,
        ..settings.process_spec()
    };
    engine.prepare(spec);
    let samples = offline::render(&mut engine, &data.samples, spec.num_channels, spec.max_block_size);

    while let Some(order) = handle.pull_announced_order() {
        debug!("Engine applied order: {order}");
    }
    info!("Final order: {}", handle.active_order());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| wav::timestamped_path(&args.output_dir));
    wav::write(&output, &wav::WavData { samples, ..data })?;

    if let Some(name) = &args.save_preset {
        let mut manager = Manager::new(&preset_dir)?;
        let mut preset = Preset::capture(name, &handle);
        if let Some(description) = &args.preset_description {
            preset = preset.with_description(description);
        }
        let path = manager.save_preset(&preset)?;
        info!("Preset '{name}' saved to {}", path.display());
    }

    Ok(())
}

fn load_presets(args: &Args, preset_dir: &Path, handle: &mut EngineHandle) -> Result<()> {
    if let Some(name) = &args.preset {
        let manager = Manager::new(preset_dir)?;
        let preset = manager
            .get_preset_by_name(name)
            .with_context(|| format!("preset '{name}' not found in {}", preset_dir.display()))?;
        info!("Loading preset '{}'", preset.name);
        handle.apply_state(&preset.state);
    }

    if let Some(path) = &args.preset_file {
        let preset = Preset::load_file(path)?;
        info!("Loading preset '{}' from {}", preset.name, path.display());
        handle.apply_state(&preset.state);
    }

    Ok(())
}

fn apply_override(params: &ParameterSet, assignment: &str) -> Result<()> {
    let Some((id, value)) = assignment.rsplit_once('=') else {
        bail!("expected ID=VALUE, got '{assignment}'");
    };

    let param = params
        .by_name(id.trim())
        .with_context(|| format!("unknown parameter '{}', see --list-params", id.trim()))?;
    let raw = param.parse_value(value)?;
    param.set_raw(raw);

    if param.raw() != raw {
        warn!("{} clamped to {}", param.name(), param.display_value());
    } else {
        debug!("{} = {}", param.name(), param.display_value());
    }

    Ok(())
}

fn list_params(params: &ParameterSet) {
    for kind in StageKind::ALL {
        println!("{kind}:");
        for param in params.params_for_kind(kind) {
            let range = match *param.spec() {
                ParamSpec::Float { min, max, step, .. } => format!("{min} ..= {max} step {step}"),
                ParamSpec::Bool { .. } => "on | off".to_string(),
                ParamSpec::Choice { choices, .. } => choices.join(" | "),
            };
            println!("  {:<26} {:<14} [{range}]", param.name(), param.display_value());
        }
    }
}
