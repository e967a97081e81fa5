//! Scope filter for combo activation
//!
//! Gates whether a matched combo may fire for a given event. It never affects
//! state tracking: pressed keys and modifiers are updated before any scope
//! check runs.

use crate::event::PlatformKeyEvent;
use crate::options::ComboOptions;

/// Whether `options` allow the combo to fire for `event`.
///
/// - Editable targets are rejected unless `allow_in_editable` is set.
/// - With scope classes, the target or one of its ancestors must carry at
///   least one of them. A leading `.` on a class name is ignored.
pub(crate) fn allows<E>(event: &E, options: &ComboOptions) -> bool
where
    E: PlatformKeyEvent + ?Sized,
{
    if !options.allow_in_editable && event.target_is_editable() {
        return false;
    }

    options.classes.is_empty()
        || options
            .classes
            .iter()
            .any(|class| event.target_matches_class(class.strip_prefix('.').unwrap_or(class)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventTarget, KeyEvent};

    #[test]
    fn test_empty_classes_is_global() {
        let event = KeyEvent::new("s");
        assert!(allows(&event, &ComboOptions::default()));
    }

    #[test]
    fn test_class_scope_matches_ancestor() {
        let options = ComboOptions::default().classes(["editor"]);

        let inside = KeyEvent::new("s")
            .with_target(EventTarget::with_classes(["line"]).inside(["editor"]));
        let outside = KeyEvent::new("s").with_target(EventTarget::with_classes(["sidebar"]));
        let no_target = KeyEvent::new("s");

        assert!(allows(&inside, &options));
        assert!(!allows(&outside, &options));
        assert!(!allows(&no_target, &options));
    }

    #[test]
    fn test_leading_dot_is_stripped() {
        let options = ComboOptions::default().classes([".modal", "editor"]);
        let event = KeyEvent::new("s").with_target(EventTarget::with_classes(["modal"]));
        assert!(allows(&event, &options));
    }

    #[test]
    fn test_editable_targets_need_opt_in() {
        let event = KeyEvent::new("s").with_target(EventTarget::default().editable());

        assert!(!allows(&event, &ComboOptions::default()));
        assert!(allows(&event, &ComboOptions::default().allow_in_editable(true)));
    }
}
