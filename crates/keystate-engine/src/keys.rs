//! Key name normalization
//!
//! Platforms disagree on how they spell keys (`"Esc"` vs `"Escape"`, `"Cmd"` vs
//! `"Meta"`, a literal `" "` for the space bar). Every raw identifier goes
//! through [`normalize_key`] before it touches the registry, so lookups are
//! always done on the canonical lowercase form.

use std::fmt;

/// Map a raw key identifier to its canonical lowercase form.
///
/// - `" "` becomes `"space"`
/// - `esc` -> `escape`, `cmd`/`command`/`win`/`windows` -> `meta`, `ctrl` -> `control`
///   (aliases apply after lowercasing)
/// - anything else is lowercased unchanged
pub fn normalize_key(key: &str) -> String {
    if key == " " {
        return "space".to_string();
    }

    let lower = key.to_lowercase();
    match lower.as_str() {
        "esc" => "escape".to_string(),
        "cmd" | "command" | "win" | "windows" => "meta".to_string(),
        "ctrl" => "control".to_string(),
        _ => lower,
    }
}

/// Canonical modifier names as they appear after normalization.
pub(crate) const CONTROL: &str = "control";
pub(crate) const SHIFT: &str = "shift";
pub(crate) const ALT: &str = "alt";
pub(crate) const META: &str = "meta";

/// Named (non-character) keys with their canonical spelling.
///
/// Character keys (`"a"`, `"/"`, `"1"`) are used as plain strings; this enum
/// only covers keys whose names are easy to misspell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Control,
    Shift,
    Alt,
    Meta,
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    Delete,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    CapsLock,
    NumLock,
    ScrollLock,
}

impl NamedKey {
    /// Canonical (normalized) name of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => CONTROL,
            Self::Shift => SHIFT,
            Self::Alt => ALT,
            Self::Meta => META,
            Self::Escape => "escape",
            Self::Enter => "enter",
            Self::Space => "space",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Delete => "delete",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::F3 => "f3",
            Self::F4 => "f4",
            Self::F5 => "f5",
            Self::F6 => "f6",
            Self::F7 => "f7",
            Self::F8 => "f8",
            Self::F9 => "f9",
            Self::F10 => "f10",
            Self::F11 => "f11",
            Self::F12 => "f12",
            Self::ArrowUp => "arrowup",
            Self::ArrowDown => "arrowdown",
            Self::ArrowLeft => "arrowleft",
            Self::ArrowRight => "arrowright",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::Insert => "insert",
            Self::CapsLock => "capslock",
            Self::NumLock => "numlock",
            Self::ScrollLock => "scrolllock",
        }
    }

    /// Whether this key is one of the four combo modifiers.
    pub fn is_modifier(self) -> bool {
        matches!(self, Self::Control | Self::Shift | Self::Alt | Self::Meta)
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<NamedKey> for String {
    fn from(key: NamedKey) -> Self {
        key.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_character_becomes_word() {
        assert_eq!(normalize_key(" "), "space");
        // The word itself is just lowercased
        assert_eq!(normalize_key("Space"), "space");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(normalize_key("Esc"), "escape");
        assert_eq!(normalize_key("Cmd"), "meta");
        assert_eq!(normalize_key("COMMAND"), "meta");
        assert_eq!(normalize_key("Win"), "meta");
        assert_eq!(normalize_key("windows"), "meta");
        assert_eq!(normalize_key("Ctrl"), "control");
    }

    #[test]
    fn test_passthrough_is_lowercased() {
        assert_eq!(normalize_key("ArrowUp"), "arrowup");
        assert_eq!(normalize_key("A"), "a");
        assert_eq!(normalize_key("Control"), "control");
        assert_eq!(normalize_key("/"), "/");
    }

    #[test]
    fn test_only_whole_aliases_are_rewritten() {
        // "ctrlx" is not the alias "ctrl"
        assert_eq!(normalize_key("CtrlX"), "ctrlx");
        // Two spaces are not the space key
        assert_eq!(normalize_key("  "), "  ");
    }

    #[test]
    fn test_named_keys_are_already_normalized() {
        for key in [
            NamedKey::Control,
            NamedKey::Escape,
            NamedKey::Space,
            NamedKey::ArrowLeft,
            NamedKey::F12,
            NamedKey::CapsLock,
        ] {
            assert_eq!(normalize_key(key.as_str()), key.as_str());
        }
        assert!(NamedKey::Meta.is_modifier());
        assert!(!NamedKey::Tab.is_modifier());
    }
}
