//! Combo descriptors and their canonical string identity
//!
//! A combo can be described three ways: a structured [`KeyCombo`], an ordered
//! list of key names (`["Ctrl", "Shift", "S"]`) or a string (`"ctrl+shift+s"`,
//! `"escape"`, or a sequence like `"g i"`). [`ComboInput`] carries whichever
//! form the caller used; [`parse_combo`] resolves it once into a [`KeyCombo`]
//! and nothing downstream ever looks at the original shape again.
//!
//! ## Canonical combo keys
//!
//! [`create_combo_key`] turns a combo into the registry identity:
//!
//! ```text
//! modifiers in fixed order   ctrl + shift + alt + meta + <normalized key>
//! ```
//!
//! A modifier token is dropped when it *is* the key. Pressing Shift on its own
//! reports `shift=true` together with key `shift`; the identity is `"shift"`,
//! never `"shift+shift"`.

use std::fmt;

use crate::keys::{normalize_key, ALT, CONTROL, META, SHIFT};

/// One of the four combo modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    /// Classify an already-normalized key name.
    pub fn from_normalized(name: &str) -> Option<Self> {
        match name {
            CONTROL => Some(Self::Ctrl),
            SHIFT => Some(Self::Shift),
            ALT => Some(Self::Alt),
            META => Some(Self::Meta),
            _ => None,
        }
    }

    /// Token used inside a combo key (`"ctrl"`, `"shift"`, ...).
    pub fn token(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Shift => "shift",
            Self::Alt => "alt",
            Self::Meta => "meta",
        }
    }

    /// Normalized name of the physical key for this modifier.
    pub fn key_name(self) -> &'static str {
        match self {
            Self::Ctrl => CONTROL,
            Self::Shift => SHIFT,
            Self::Alt => ALT,
            Self::Meta => META,
        }
    }
}

/// Structured combo: modifier flags plus one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    pub key: String,
}

impl KeyCombo {
    /// Combo with no modifiers.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    fn set(&mut self, modifier: Modifier) {
        match modifier {
            Modifier::Ctrl => self.ctrl = true,
            Modifier::Shift => self.shift = true,
            Modifier::Alt => self.alt = true,
            Modifier::Meta => self.meta = true,
        }
    }

    fn has(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Alt => self.alt,
            Modifier::Meta => self.meta,
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&create_combo_key(self))
    }
}

/// The shapes a combo descriptor can arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboInput {
    /// Already structured; used as-is
    Combo(KeyCombo),
    /// Ordered key names, e.g. `["Ctrl", "Shift", "S"]`
    Keys(Vec<String>),
    /// `"ctrl+s"`, a bare key like `"escape"`, or a sequence like `"g i"`
    Text(String),
}

impl From<KeyCombo> for ComboInput {
    fn from(combo: KeyCombo) -> Self {
        Self::Combo(combo)
    }
}

impl From<&str> for ComboInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ComboInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<crate::keys::NamedKey> for ComboInput {
    fn from(key: crate::keys::NamedKey) -> Self {
        Self::Text(key.as_str().to_string())
    }
}

impl From<Vec<String>> for ComboInput {
    fn from(keys: Vec<String>) -> Self {
        Self::Keys(keys)
    }
}

impl From<Vec<&str>> for ComboInput {
    fn from(keys: Vec<&str>) -> Self {
        Self::Keys(keys.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ComboInput {
    fn from(keys: [&str; N]) -> Self {
        Self::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Resolve any combo descriptor into a structured [`KeyCombo`].
///
/// List elements and `+`-separated string parts are normalized and classified
/// as modifiers or the key. The raw (un-normalized) spelling of the key is
/// kept; [`create_combo_key`] normalizes it. When every part is a modifier the
/// last one doubles as the key, so `"ctrl+shift"` means "Shift pressed while
/// Ctrl is held". A string without `+` is a bare key.
pub fn parse_combo(input: &ComboInput) -> KeyCombo {
    match input {
        ComboInput::Combo(combo) => combo.clone(),
        ComboInput::Keys(keys) => classify(keys.iter().map(String::as_str)),
        ComboInput::Text(text) => {
            if text.contains('+') {
                classify(text.split('+').map(str::trim))
            } else {
                KeyCombo::new(text.as_str())
            }
        }
    }
}

fn classify<'a>(parts: impl Iterator<Item = &'a str>) -> KeyCombo {
    let mut combo = KeyCombo::default();
    let mut key: Option<&str> = None;
    let mut last_modifier: Option<&str> = None;

    for part in parts {
        match Modifier::from_normalized(&normalize_key(part)) {
            Some(modifier) => {
                combo.set(modifier);
                last_modifier = Some(part);
            }
            None => key = Some(part),
        }
    }

    combo.key = key.or(last_modifier).unwrap_or_default().to_string();
    combo
}

/// Build the canonical registry identity of a combo.
///
/// Deterministic regardless of how the modifiers were ordered in the input.
pub fn create_combo_key(combo: &KeyCombo) -> String {
    let key = normalize_key(&combo.key);
    let mut parts: Vec<&str> = Vec::with_capacity(5);

    for modifier in [Modifier::Ctrl, Modifier::Shift, Modifier::Alt, Modifier::Meta] {
        if combo.has(modifier) && key != modifier.key_name() {
            parts.push(modifier.token());
        }
    }

    parts.push(&key);
    parts.join("+")
}

/// Shortcut for `create_combo_key(&parse_combo(&input.into()))`.
pub fn combo_key_of(input: impl Into<ComboInput>) -> String {
    create_combo_key(&parse_combo(&input.into()))
}
