//! keystate CLI
//!
//! Validates configuration, lists input devices, and drives the keyboard-state
//! engine from a real evdev keyboard.

mod bindings;
mod device;
mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keystate_config::Config;
use keystate_engine::{Engine, EngineConfig, KeyState, PlaybackOutcome};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use crate::bindings::ActionSink;
use crate::input::{InputTranslator, KeyInput};

#[derive(Parser, Debug)]
#[command(name = "keystate")]
#[command(about = "Global keyboard state, combos and sequences from an input device")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/keystate/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List available input devices
    Devices,

    /// Feed a keyboard into the engine, print fired bindings and state snapshots
    Monitor {
        /// Input device (defaults to the configured device, then the first keyboard)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Record a macro from a keyboard, then play it back
    Record {
        /// Input device (defaults to the configured device, then the first keyboard)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// How long to record
        #[arg(short, long, default_value_t = 5)]
        seconds: u64,

        /// Print the recorded macro as JSON before playback
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    let config = load_config(&config_path);
    init_tracing(
        config
            .as_ref()
            .map_or("warn", |c| c.global.log_level.as_filter()),
    );

    let result = match cli.command {
        Commands::Validate => return cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
        Commands::Monitor { device, json } => {
            let config = config.map_err(report)?;
            cmd_monitor(&config, device, json).await
        }
        Commands::Record {
            device,
            seconds,
            json,
        } => {
            let config = config.map_err(report)?;
            cmd_record(&config, device, Duration::from_secs(seconds), json).await
        }
    };

    result.map_err(report)
}

fn report(err: anyhow::Error) -> miette::Report {
    miette::miette!("{:#}", err)
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Parse the config file, or fall back to defaults when there is none.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    keystate_config::parse_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = keystate_config::parse_config(config_path).map_err(miette::Report::new)?;

    println!("Configuration is valid!");
    println!("  Log level: {}", config.global.log_level.as_filter());
    println!(
        "  Timing: frame {}ms, sequence timeout {}ms, focus guard {}ms",
        config.timing.frame_interval_ms,
        config.timing.sequence_timeout_ms,
        config.timing.focus_guard_ms
    );
    if let Some(device) = &config.device {
        println!("  Device: {}", device.display());
    }
    println!("  Bindings: {}", config.bindings.len());
    for binding in &config.bindings {
        let combo_key = keystate_engine::combo_key_of(binding.combo.as_str());
        let mut notes = Vec::new();
        if !binding.enabled {
            notes.push("disabled".to_string());
        }
        if binding.hold_ms > 0 {
            notes.push(format!("hold {}ms", binding.hold_ms));
        }
        if notes.is_empty() {
            println!("    - {} -> {}", combo_key, binding.action);
        } else {
            println!("    - {} -> {} ({})", combo_key, binding.action, notes.join(", "));
        }
    }
    Ok(())
}

fn cmd_devices() -> Result<()> {
    println!("Available input devices:\n");

    for device in device::enumerate_devices()? {
        let device_type = if device.keyboard { "keyboard" } else { "other" };
        println!("  {} [{}]", device.name, device_type);
        println!("    Path: {}", device.path.display());
        println!("    ID: {}", device.vendor_product());
        println!();
    }

    Ok(())
}

fn print_snapshot(state: &KeyState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    let modifiers: Vec<&str> = [
        (state.ctrl, "ctrl"),
        (state.shift, "shift"),
        (state.alt, "alt"),
        (state.meta, "meta"),
        (state.caps_lock, "capslock"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    let pressed: Vec<&str> = state.pressed_keys.iter().map(String::as_str).collect();

    println!(
        "[{}] pressed: [{}] last: {}",
        modifiers.join(" "),
        pressed.join(", "),
        state.last_pressed_key.as_deref().unwrap_or("-")
    );
    Ok(())
}

async fn cmd_monitor(config: &Config, device: Option<PathBuf>, json: bool) -> Result<()> {
    let engine = Engine::new(EngineConfig::from(&config.timing))?;

    let sink: ActionSink = Arc::new(|action: &str| {
        tracing::info!("Action fired: {}", action);
        println!(">> {}", action);
    });
    let registrations = bindings::register_bindings(&engine, &config.bindings, sink)?;

    let path = device::resolve_device(device, config.device.as_deref())?;
    let mut events = device::open_device(&path)?
        .into_event_stream()
        .with_context(|| format!("Failed to create event stream for {}", path.display()))?;
    let mut snapshots = WatchStream::new(engine.subscribe());
    let mut translator = InputTranslator::new();

    tracing::info!(
        "Monitoring {} with {} binding(s); Ctrl+C to stop",
        path.display(),
        registrations.len()
    );

    loop {
        tokio::select! {
            event = events.next_event() => {
                let event = event.context("Failed to read input event")?;
                match translator.translate(&event) {
                    Some(KeyInput::Down(key)) => engine.key_down(&key),
                    Some(KeyInput::Up(key)) => engine.key_up(&key),
                    None => {}
                }
            }
            Some(state) = snapshots.next() => print_snapshot(&state, json)?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down...");
    for registration in &registrations {
        registration.unregister();
    }
    engine.dispose();
    Ok(())
}

async fn cmd_record(
    config: &Config,
    device: Option<PathBuf>,
    duration: Duration,
    json: bool,
) -> Result<()> {
    let engine = Engine::new(EngineConfig::from(&config.timing))?;
    let path = device::resolve_device(device, config.device.as_deref())?;
    let mut events = device::open_device(&path)?
        .into_event_stream()
        .with_context(|| format!("Failed to create event stream for {}", path.display()))?;
    let mut translator = InputTranslator::new();

    println!(
        "Recording from {} for {}s...",
        path.display(),
        duration.as_secs()
    );
    engine.recorder().start_recording();

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = events.next_event() => {
                let event = event.context("Failed to read input event")?;
                match translator.translate(&event) {
                    Some(KeyInput::Down(key)) => engine.key_down(&key),
                    Some(KeyInput::Up(key)) => engine.key_up(&key),
                    None => {}
                }
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let Some(recorded) = engine.recorder().stop_recording() else {
        anyhow::bail!("Recording was interrupted");
    };
    println!(
        "Recorded {} key(s) over {}ms",
        recorded.len(),
        recorded.duration().as_millis()
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&*recorded)?);
    }
    if recorded.is_empty() {
        engine.dispose();
        return Ok(());
    }

    println!("Playing back...");
    let outcome = engine
        .recorder()
        .play_macro(&recorded, |step| println!("  {:>6}ms  {}", step.timestamp_ms, step))
        .await;
    if outcome == PlaybackOutcome::Aborted {
        tracing::warn!("Playback was aborted");
    }

    engine.dispose();
    Ok(())
}
