//! Platform adapter types
//!
//! The engine never talks to a real input surface. Whatever produces key
//! events (a DOM bridge, an evdev reader, a test) implements
//! [`PlatformKeyEvent`]; the engine only asks it for the raw key, the modifier
//! state, the repeat flag and a couple of questions about the event target.
//! [`KeyEvent`] is the ready-made implementation used by the CLI and tests.

use std::cell::Cell;

/// Modifier flags carried by a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierFlags {
    pub caps_lock: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierFlags {
    /// True when any of ctrl/shift/alt/meta is held (caps lock does not count).
    pub fn any_held(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }
}

/// A key-down or key-up event as delivered by the platform.
pub trait PlatformKeyEvent {
    /// Raw key identifier, before normalization.
    fn key(&self) -> &str;

    /// Modifier state, or `None` when the platform could not report it.
    ///
    /// Events without modifier state are dropped by the engine without
    /// touching any state.
    fn modifiers(&self) -> Option<ModifierFlags>;

    /// Auto-repeat keydown.
    fn is_repeat(&self) -> bool {
        false
    }

    /// Whether the target element, or one of its ancestors, carries `class`.
    fn target_matches_class(&self, _class: &str) -> bool {
        false
    }

    /// Whether the target is an editable control (text field, content-editable).
    fn target_is_editable(&self) -> bool {
        false
    }

    /// Ask the platform to suppress its default handling of this event.
    fn prevent_default(&self) {}
}

/// The element an event was dispatched to, as a chain of class lists.
///
/// `ancestry[0]` is the target itself, followed by its parents outward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTarget {
    ancestry: Vec<Vec<String>>,
    editable: bool,
}

impl EventTarget {
    /// Target whose own element carries `classes`.
    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().inside(classes)
    }

    /// Add an enclosing ancestor carrying `classes`.
    pub fn inside<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestry
            .push(classes.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the target as an editable control.
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Inclusive ancestor lookup, like `Element::closest(".class")`.
    pub fn closest(&self, class: &str) -> bool {
        self.ancestry
            .iter()
            .any(|element| element.iter().any(|c| c == class))
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }
}

/// Concrete key event.
///
/// Built with [`KeyEvent::new`] and the `with_*` helpers. `prevent_default`
/// is recorded and can be inspected with [`KeyEvent::default_prevented`].
#[derive(Debug, Clone, Default)]
pub struct KeyEvent {
    key: String,
    modifiers: Option<ModifierFlags>,
    repeat: bool,
    target: Option<EventTarget>,
    default_prevented: Cell<bool>,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Some(ModifierFlags::default()),
            ..Self::default()
        }
    }

    /// Event whose platform reported no modifier state.
    pub fn without_modifier_state(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: None,
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierFlags) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn with_ctrl(self) -> Self {
        self.modify(|m| m.ctrl = true)
    }

    pub fn with_shift(self) -> Self {
        self.modify(|m| m.shift = true)
    }

    pub fn with_alt(self) -> Self {
        self.modify(|m| m.alt = true)
    }

    pub fn with_meta(self) -> Self {
        self.modify(|m| m.meta = true)
    }

    pub fn with_caps_lock(self) -> Self {
        self.modify(|m| m.caps_lock = true)
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    fn modify(mut self, f: impl FnOnce(&mut ModifierFlags)) -> Self {
        let mut flags = self.modifiers.unwrap_or_default();
        f(&mut flags);
        self.modifiers = Some(flags);
        self
    }
}

impl PlatformKeyEvent for KeyEvent {
    fn key(&self) -> &str {
        &self.key
    }

    fn modifiers(&self) -> Option<ModifierFlags> {
        self.modifiers
    }

    fn is_repeat(&self) -> bool {
        self.repeat
    }

    fn target_matches_class(&self, class: &str) -> bool {
        self.target.as_ref().map_or(false, |t| t.closest(class))
    }

    fn target_is_editable(&self) -> bool {
        self.target.as_ref().map_or(false, EventTarget::is_editable)
    }

    fn prevent_default(&self) {
        self.default_prevented.set(true);
    }
}

/// Window/document focus notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    /// The window lost focus
    Blur,
    /// The window regained focus
    Focus,
    /// The document visibility changed
    Visibility { hidden: bool },
}

impl FocusEvent {
    /// Whether this notification means keyups may have been lost.
    pub fn resets_state(self) -> bool {
        match self {
            Self::Blur | Self::Focus => true,
            Self::Visibility { hidden } => hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_is_inclusive_of_target() {
        let target = EventTarget::with_classes(["input", "editor"]).inside(["modal"]);
        assert!(target.closest("editor"));
        assert!(target.closest("modal"));
        assert!(!target.closest("sidebar"));
    }

    #[test]
    fn test_key_event_modifier_helpers() {
        let event = KeyEvent::new("s").with_ctrl().with_shift();
        let flags = event.modifiers().unwrap();
        assert!(flags.ctrl && flags.shift);
        assert!(!flags.alt && !flags.meta && !flags.caps_lock);
        assert!(flags.any_held());
    }

    #[test]
    fn test_caps_lock_is_not_a_held_modifier() {
        let flags = KeyEvent::new("a").with_caps_lock().modifiers().unwrap();
        assert!(flags.caps_lock);
        assert!(!flags.any_held());
    }

    #[test]
    fn test_missing_modifier_state() {
        assert!(KeyEvent::without_modifier_state("a").modifiers().is_none());
    }

    #[test]
    fn test_prevent_default_is_recorded() {
        let event = KeyEvent::new("tab");
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_focus_events_that_reset() {
        assert!(FocusEvent::Blur.resets_state());
        assert!(FocusEvent::Focus.resets_state());
        assert!(FocusEvent::Visibility { hidden: true }.resets_state());
        assert!(!FocusEvent::Visibility { hidden: false }.resets_state());
    }
}
