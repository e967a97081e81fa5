//! evdev to engine event translation
//!
//! evdev reports scancodes with a press/release/repeat value and no modifier
//! state. [`InputTranslator`] tracks held modifiers and the caps lock toggle
//! itself and turns each key event into a [`KeyEvent`] carrying a key name in
//! the spelling the engine normalizes (`"Control"`, `"ArrowUp"`, `" "`, ...).
//!
//! Key names are layout independent: digits and symbols are reported
//! unshifted, so Shift+1 arrives as `shift` + `"1"`.

use std::collections::HashSet;

use evdev::{EventType, InputEvent, Key};
use keystate_engine::{KeyEvent, ModifierFlags};

/// evdev key event values
pub mod event_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

/// A translated key event, ready for `Engine::key_down` / `Engine::key_up`.
#[derive(Debug)]
pub enum KeyInput {
    Down(KeyEvent),
    Up(KeyEvent),
}

#[derive(Debug, Default)]
pub struct InputTranslator {
    held: HashSet<Key>,
    caps_lock: bool,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate a raw evdev event. Non-key events and unmapped keys yield `None`.
    pub fn translate(&mut self, event: &InputEvent) -> Option<KeyInput> {
        if event.event_type() != EventType::KEY {
            return None;
        }
        self.translate_key(Key::new(event.code()), event.value())
    }

    pub fn translate_key(&mut self, key: Key, value: i32) -> Option<KeyInput> {
        let Some(name) = key_name(key) else {
            tracing::trace!("No key name for {:?}, ignoring", key);
            return None;
        };

        match value {
            event_value::PRESS => {
                self.held.insert(key);
                if key == Key::KEY_CAPSLOCK {
                    self.caps_lock = !self.caps_lock;
                }
                Some(KeyInput::Down(self.event(name)))
            }
            event_value::REPEAT => Some(KeyInput::Down(self.event(name).repeated())),
            event_value::RELEASE => {
                self.held.remove(&key);
                Some(KeyInput::Up(self.event(name)))
            }
            _ => None,
        }
    }

    pub fn modifiers(&self) -> ModifierFlags {
        let held = |left, right| self.held.contains(&left) || self.held.contains(&right);
        ModifierFlags {
            caps_lock: self.caps_lock,
            ctrl: held(Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL),
            shift: held(Key::KEY_LEFTSHIFT, Key::KEY_RIGHTSHIFT),
            alt: held(Key::KEY_LEFTALT, Key::KEY_RIGHTALT),
            meta: held(Key::KEY_LEFTMETA, Key::KEY_RIGHTMETA),
        }
    }

    fn event(&self, name: &str) -> KeyEvent {
        KeyEvent::new(name).with_modifiers(self.modifiers())
    }
}

/// Engine-facing name of an evdev key.
pub fn key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        // Letters
        Key::KEY_A => "a",
        Key::KEY_B => "b",
        Key::KEY_C => "c",
        Key::KEY_D => "d",
        Key::KEY_E => "e",
        Key::KEY_F => "f",
        Key::KEY_G => "g",
        Key::KEY_H => "h",
        Key::KEY_I => "i",
        Key::KEY_J => "j",
        Key::KEY_K => "k",
        Key::KEY_L => "l",
        Key::KEY_M => "m",
        Key::KEY_N => "n",
        Key::KEY_O => "o",
        Key::KEY_P => "p",
        Key::KEY_Q => "q",
        Key::KEY_R => "r",
        Key::KEY_S => "s",
        Key::KEY_T => "t",
        Key::KEY_U => "u",
        Key::KEY_V => "v",
        Key::KEY_W => "w",
        Key::KEY_X => "x",
        Key::KEY_Y => "y",
        Key::KEY_Z => "z",

        // Number row
        Key::KEY_0 => "0",
        Key::KEY_1 => "1",
        Key::KEY_2 => "2",
        Key::KEY_3 => "3",
        Key::KEY_4 => "4",
        Key::KEY_5 => "5",
        Key::KEY_6 => "6",
        Key::KEY_7 => "7",
        Key::KEY_8 => "8",
        Key::KEY_9 => "9",

        // Symbols
        Key::KEY_MINUS => "-",
        Key::KEY_EQUAL => "=",
        Key::KEY_LEFTBRACE => "[",
        Key::KEY_RIGHTBRACE => "]",
        Key::KEY_SEMICOLON => ";",
        Key::KEY_APOSTROPHE => "'",
        Key::KEY_GRAVE => "`",
        Key::KEY_BACKSLASH => "\\",
        Key::KEY_COMMA => ",",
        Key::KEY_DOT => ".",
        Key::KEY_SLASH => "/",

        // Modifiers
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "Control",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "Shift",
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => "Alt",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "Meta",
        Key::KEY_CAPSLOCK => "CapsLock",

        // Editing and navigation
        Key::KEY_SPACE => " ",
        Key::KEY_ENTER | Key::KEY_KPENTER => "Enter",
        Key::KEY_ESC => "Escape",
        Key::KEY_TAB => "Tab",
        Key::KEY_BACKSPACE => "Backspace",
        Key::KEY_DELETE => "Delete",
        Key::KEY_INSERT => "Insert",
        Key::KEY_HOME => "Home",
        Key::KEY_END => "End",
        Key::KEY_PAGEUP => "PageUp",
        Key::KEY_PAGEDOWN => "PageDown",
        Key::KEY_UP => "ArrowUp",
        Key::KEY_DOWN => "ArrowDown",
        Key::KEY_LEFT => "ArrowLeft",
        Key::KEY_RIGHT => "ArrowRight",

        // Function keys
        Key::KEY_F1 => "F1",
        Key::KEY_F2 => "F2",
        Key::KEY_F3 => "F3",
        Key::KEY_F4 => "F4",
        Key::KEY_F5 => "F5",
        Key::KEY_F6 => "F6",
        Key::KEY_F7 => "F7",
        Key::KEY_F8 => "F8",
        Key::KEY_F9 => "F9",
        Key::KEY_F10 => "F10",
        Key::KEY_F11 => "F11",
        Key::KEY_F12 => "F12",

        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use keystate_engine::{normalize_key, PlatformKeyEvent};

    use super::*;

    fn down(input: Option<KeyInput>) -> KeyEvent {
        match input {
            Some(KeyInput::Down(event)) => event,
            other => panic!("expected keydown, got {:?}", other),
        }
    }

    #[test]
    fn test_modifier_flags_follow_held_keys() {
        let mut translator = InputTranslator::new();

        let ctrl = down(translator.translate_key(Key::KEY_RIGHTCTRL, event_value::PRESS));
        assert_eq!(ctrl.key(), "Control");
        assert!(ctrl.modifiers().unwrap().ctrl, "modifier keydown reports itself as held");

        let s = down(translator.translate_key(Key::KEY_S, event_value::PRESS));
        assert!(s.modifiers().unwrap().ctrl);

        match translator.translate_key(Key::KEY_RIGHTCTRL, event_value::RELEASE) {
            Some(KeyInput::Up(event)) => assert!(!event.modifiers().unwrap().ctrl),
            other => panic!("expected keyup, got {:?}", other),
        }
    }

    #[test]
    fn test_repeat_is_flagged() {
        let mut translator = InputTranslator::new();
        translator.translate_key(Key::KEY_J, event_value::PRESS);
        let repeat = down(translator.translate_key(Key::KEY_J, event_value::REPEAT));
        assert!(repeat.is_repeat());
    }

    #[test]
    fn test_caps_lock_toggles_on_press() {
        let mut translator = InputTranslator::new();
        translator.translate_key(Key::KEY_CAPSLOCK, event_value::PRESS);
        translator.translate_key(Key::KEY_CAPSLOCK, event_value::RELEASE);
        assert!(translator.modifiers().caps_lock);
        assert!(!translator.modifiers().any_held());

        translator.translate_key(Key::KEY_CAPSLOCK, event_value::PRESS);
        assert!(!translator.modifiers().caps_lock);
    }

    #[test]
    fn test_key_names_normalize_to_engine_names() {
        assert_eq!(normalize_key(key_name(Key::KEY_SPACE).unwrap()), "space");
        assert_eq!(normalize_key(key_name(Key::KEY_ESC).unwrap()), "escape");
        assert_eq!(normalize_key(key_name(Key::KEY_LEFTMETA).unwrap()), "meta");
        assert_eq!(normalize_key(key_name(Key::KEY_UP).unwrap()), "arrowup");
        assert_eq!(key_name(Key::KEY_PROG1), None);
    }

    #[test]
    fn test_unmapped_key_is_skipped() {
        let mut translator = InputTranslator::new();
        assert!(translator
            .translate_key(Key::KEY_PROG1, event_value::PRESS)
            .is_none());
    }

    #[test]
    fn test_non_key_events_are_skipped() {
        let mut translator = InputTranslator::new();
        let sync = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert!(translator.translate(&sync).is_none());

        let key = InputEvent::new(EventType::KEY, Key::KEY_A.code(), event_value::PRESS);
        assert!(matches!(translator.translate(&key), Some(KeyInput::Down(_))));
    }
}
