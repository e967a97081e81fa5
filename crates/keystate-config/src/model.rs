//! Configuration data model

use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub timing: TimingConfig,
    pub bindings: Vec<Binding>,
    /// Default input device for the CLI (tilde expanded)
    pub device: Option<PathBuf>,
}

/// Global settings
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Engine timing knobs, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Snapshot coalescing window (one "frame")
    pub frame_interval_ms: u64,
    /// Idle time after which a partial key sequence is discarded
    pub sequence_timeout_ms: u64,
    /// How long a lone Alt/Meta press may go without a keyup before state is reset
    pub focus_guard_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            sequence_timeout_ms: 1000,
            focus_guard_ms: 100,
        }
    }
}

/// A combo (or key sequence) bound to a named action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Combo descriptor, e.g. `"ctrl+s"` or the sequence `"g i"`
    pub combo: String,
    /// Name reported when the binding fires
    pub action: String,
    pub prevent_default: bool,
    pub allow_in_editable: bool,
    pub enabled: bool,
    /// Hold threshold; 0 means the binding fires on press
    pub hold_ms: u64,
    /// Scope classes; empty means global
    pub classes: Vec<String>,
}

impl Binding {
    pub fn new(combo: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            combo: combo.into(),
            action: action.into(),
            prevent_default: false,
            allow_in_editable: false,
            enabled: true,
            hold_ms: 0,
            classes: Vec::new(),
        }
    }
}
