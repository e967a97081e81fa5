//! Aggregate keyboard state
//!
//! [`KeyState`] is both the live state mutated by event dispatch and the
//! immutable snapshot handed to subscribers: a snapshot is simply a clone taken
//! at publish time. Equality is field equality with set equality on
//! `pressed_keys`, which is exactly what snapshot de-duplication needs.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::event::ModifierFlags;
use crate::keys::normalize_key;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyState {
    pub caps_lock: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS, the Windows key elsewhere
    pub meta: bool,
    /// Canonical names of every key currently held
    pub pressed_keys: BTreeSet<String>,
    /// Last canonical key pressed, if any
    pub last_pressed_key: Option<String>,
}

/// Argument to [`KeyState::is_key_pressed`]: one key, or several that must all be held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyQuery {
    One(String),
    All(Vec<String>),
}

impl From<&str> for KeyQuery {
    fn from(key: &str) -> Self {
        Self::One(key.to_string())
    }
}

impl From<String> for KeyQuery {
    fn from(key: String) -> Self {
        Self::One(key)
    }
}

impl From<crate::keys::NamedKey> for KeyQuery {
    fn from(key: crate::keys::NamedKey) -> Self {
        Self::One(key.as_str().to_string())
    }
}

impl From<Vec<&str>> for KeyQuery {
    fn from(keys: Vec<&str>) -> Self {
        Self::All(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for KeyQuery {
    fn from(keys: Vec<String>) -> Self {
        Self::All(keys)
    }
}

impl<const N: usize> From<[&str; N]> for KeyQuery {
    fn from(keys: [&str; N]) -> Self {
        Self::All(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl KeyState {
    /// Ctrl or Cmd/Win held: the usual "primary shortcut modifier" test.
    pub fn is_ctrl_or_meta(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Exact-match test over `pressed_keys`; a list is a logical AND.
    ///
    /// Query keys are normalized first, so `"Esc"` finds `"escape"`.
    pub fn is_key_pressed(&self, query: impl Into<KeyQuery>) -> bool {
        match query.into() {
            KeyQuery::One(key) => self.pressed_keys.contains(&normalize_key(&key)),
            KeyQuery::All(keys) => keys
                .iter()
                .all(|k| self.pressed_keys.contains(&normalize_key(k))),
        }
    }

    pub(crate) fn apply_modifiers(&mut self, flags: ModifierFlags) {
        self.caps_lock = flags.caps_lock;
        self.shift = flags.shift;
        self.ctrl = flags.ctrl;
        self.alt = flags.alt;
        self.meta = flags.meta;
    }

    pub(crate) fn apply_key_down(&mut self, key: &str, flags: ModifierFlags) {
        self.apply_modifiers(flags);
        self.pressed_keys.insert(key.to_string());
        self.last_pressed_key = Some(key.to_string());
    }

    pub(crate) fn apply_key_up(&mut self, key: &str, flags: ModifierFlags) {
        self.apply_modifiers(flags);
        self.pressed_keys.remove(key);
    }

    /// Drop every held modifier and key. Caps lock and the last key survive.
    pub(crate) fn release_all(&mut self) {
        self.shift = false;
        self.ctrl = false;
        self.alt = false;
        self.meta = false;
        self.pressed_keys.clear();
    }
}
