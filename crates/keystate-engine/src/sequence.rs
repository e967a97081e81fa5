//! Multi-key sequence buffer (`"g i"`, `"g h"`, ...)
//!
//! Only unmodified single-character keys take part. Keys are accumulated and
//! the buffer, joined with single spaces, is looked up in the same registry as
//! combos. When the buffer stops being the start of any registered sequence,
//! leading keys are dropped until it is one again (or the buffer is empty), so
//! stray keystrokes typed before a sequence do not jam it.

use crate::event::ModifierFlags;
use crate::registry::Registry;

#[derive(Debug, Default)]
pub(crate) struct SequenceBuffer {
    keys: Vec<String>,
}

impl SequenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a normalized keydown takes part in sequence matching at all.
    pub fn qualifies(key: &str, modifiers: ModifierFlags) -> bool {
        !modifiers.any_held() && key.chars().count() == 1
    }

    /// Append `key` and return the candidate sequence when it names a
    /// registered multi-key sequence.
    ///
    /// A lone key is never a candidate; single keys are handled as combos.
    pub fn push(&mut self, key: &str, registry: &Registry) -> Option<String> {
        self.keys.push(key.to_string());
        if self.keys.len() < 2 {
            return None;
        }
        let candidate = self.joined();
        registry.contains_combo(&candidate).then_some(candidate)
    }

    /// Drop leading keys until the buffer is the start of a registered sequence.
    pub fn prune(&mut self, registry: &Registry) {
        while !self.keys.is_empty() && !registry.has_sequence_prefix(&self.joined()) {
            self.keys.remove(0);
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn joined(&self) -> String {
        self.keys.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::options::ComboOptions;

    fn registry_with(keys: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for key in keys {
            registry.insert_combo(key.to_string(), Arc::new(|| {}), ComboOptions::default());
        }
        registry
    }

    #[test]
    fn test_qualifying_keys() {
        let none = ModifierFlags::default();
        assert!(SequenceBuffer::qualifies("g", none));
        assert!(SequenceBuffer::qualifies("/", none));
        assert!(!SequenceBuffer::qualifies("enter", none));
        assert!(!SequenceBuffer::qualifies(
            "g",
            ModifierFlags {
                ctrl: true,
                ..none
            }
        ));
        // Caps lock is not a held modifier
        assert!(SequenceBuffer::qualifies(
            "g",
            ModifierFlags {
                caps_lock: true,
                ..none
            }
        ));
    }

    #[test]
    fn test_two_key_sequence_matches() {
        let registry = registry_with(&["g i"]);
        let mut buffer = SequenceBuffer::new();

        assert_eq!(buffer.push("g", &registry), None);
        buffer.prune(&registry);
        assert_eq!(buffer.keys(), ["g"]);

        assert_eq!(buffer.push("i", &registry).as_deref(), Some("g i"));
    }

    #[test]
    fn test_single_key_is_never_a_candidate() {
        let registry = registry_with(&["g"]);
        let mut buffer = SequenceBuffer::new();
        assert_eq!(buffer.push("g", &registry), None);
    }

    #[test]
    fn test_stray_key_is_pruned() {
        let registry = registry_with(&["g i"]);
        let mut buffer = SequenceBuffer::new();

        buffer.push("x", &registry);
        buffer.prune(&registry);
        assert!(buffer.is_empty());

        buffer.push("g", &registry);
        buffer.prune(&registry);
        assert_eq!(buffer.push("i", &registry).as_deref(), Some("g i"));
    }

    #[test]
    fn test_prune_keeps_longest_viable_suffix() {
        let registry = registry_with(&["g g i"]);
        let mut buffer = SequenceBuffer::new();

        for key in ["g", "g", "g"] {
            buffer.push(key, &registry);
            buffer.prune(&registry);
        }
        // "g g g" is not a prefix of "g g i" but "g g" is
        assert_eq!(buffer.keys(), ["g", "g"]);
        assert_eq!(buffer.push("i", &registry).as_deref(), Some("g g i"));
    }
}
