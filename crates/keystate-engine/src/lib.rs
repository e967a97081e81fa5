//! Keyboard-state engine
//!
//! Tracks which keys and modifiers are held, matches registered combos and
//! multi-key sequences, runs hold/release timers, and publishes de-duplicated
//! [`KeyState`] snapshots at most once per frame. Input arrives through the
//! [`PlatformKeyEvent`] trait, so the engine is independent of where key
//! events come from.

mod combo;
mod engine;
mod error;
mod event;
mod keys;
mod options;
mod recorder;
mod registry;
mod scope;
mod sequence;
mod state;
mod timers;

pub use combo::{combo_key_of, create_combo_key, parse_combo, ComboInput, KeyCombo, Modifier};
pub use engine::{Engine, EngineConfig, Registration, Shortcut};
pub use error::EngineError;
pub use event::{EventTarget, FocusEvent, KeyEvent, ModifierFlags, PlatformKeyEvent};
pub use keys::{normalize_key, NamedKey};
pub use options::{ComboCallback, ComboOptions, WatchCallback};
pub use recorder::{PlaybackOutcome, RecordedKeyEvent, RecordedMacro, Recorder};
pub use state::{KeyQuery, KeyState};
