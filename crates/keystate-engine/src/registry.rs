//! Combo and key-watch registry
//!
//! Pure bookkeeping: no timers, no locking. The engine wraps a [`Registry`]
//! in its state lock and coordinates timers around it.
//!
//! Every registration gets a unique id. A combo key maps to at most one entry
//! (a later registration replaces the earlier one); removal is by
//! `(combo key, id)` so a superseded registration can never remove the entry
//! that replaced it. Watches keep an ordered list per key; removal only drops
//! the entry with the matching id, and the key disappears once its list is
//! empty.

use std::collections::HashMap;

use crate::options::{ComboCallback, ComboOptions, WatchCallback};

pub(crate) type RegistrationId = u64;

pub(crate) struct ComboEntry {
    pub id: RegistrationId,
    pub callback: ComboCallback,
    pub options: ComboOptions,
}

struct WatchEntry {
    id: RegistrationId,
    callback: WatchCallback,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: RegistrationId,
    combos: HashMap<String, ComboEntry>,
    watches: HashMap<String, Vec<WatchEntry>>,
}

/// Outcome of [`Registry::insert_combo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Inserted {
    pub id: RegistrationId,
    /// An earlier registration under the same combo key was overwritten
    pub replaced: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> RegistrationId {
        self.next_id += 1;
        self.next_id
    }

    /// Store a combo registration; last write wins.
    pub fn insert_combo(
        &mut self,
        combo_key: String,
        callback: ComboCallback,
        options: ComboOptions,
    ) -> Inserted {
        let id = self.allocate_id();
        let replaced = self
            .combos
            .insert(combo_key, ComboEntry { id, callback, options })
            .is_some();
        Inserted { id, replaced }
    }

    /// Remove a combo entry, but only if it is still the one `id` created.
    pub fn remove_combo(&mut self, combo_key: &str, id: RegistrationId) -> bool {
        if self.owns_combo(combo_key, id) {
            self.combos.remove(combo_key);
            true
        } else {
            false
        }
    }

    pub fn owns_combo(&self, combo_key: &str, id: RegistrationId) -> bool {
        self.combos.get(combo_key).map_or(false, |e| e.id == id)
    }

    pub fn combo(&self, combo_key: &str) -> Option<&ComboEntry> {
        self.combos.get(combo_key)
    }

    /// Mutable access to a combo entry, only while `id` still owns it.
    pub fn combo_mut(&mut self, combo_key: &str, id: RegistrationId) -> Option<&mut ComboEntry> {
        self.combos.get_mut(combo_key).filter(|e| e.id == id)
    }

    pub fn contains_combo(&self, combo_key: &str) -> bool {
        self.combos.contains_key(combo_key)
    }

    /// Whether some registered multi-key sequence continues past `prefix`.
    pub fn has_sequence_prefix(&self, prefix: &str) -> bool {
        let mut with_sep = String::with_capacity(prefix.len() + 1);
        with_sep.push_str(prefix);
        with_sep.push(' ');
        self.combos.keys().any(|k| k.starts_with(&with_sep))
    }

    pub fn insert_watch(&mut self, key: String, callback: WatchCallback) -> RegistrationId {
        let id = self.allocate_id();
        self.watches
            .entry(key)
            .or_default()
            .push(WatchEntry { id, callback });
        id
    }

    pub fn remove_watch(&mut self, key: &str, id: RegistrationId) -> bool {
        let Some(entries) = self.watches.get_mut(key) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            self.watches.remove(key);
        }
        removed
    }

    /// Watch callbacks for `key`, in registration order.
    pub fn watchers(&self, key: &str) -> Vec<WatchCallback> {
        self.watches
            .get(key)
            .map(|entries| entries.iter().map(|e| e.callback.clone()).collect())
            .unwrap_or_default()
    }

    pub fn owns_watch(&self, key: &str, id: RegistrationId) -> bool {
        self.watches
            .get(key)
            .map_or(false, |entries| entries.iter().any(|e| e.id == id))
    }

    pub fn is_watched(&self, key: &str) -> bool {
        self.watches.contains_key(key)
    }

    pub fn combo_count(&self) -> usize {
        self.combos.len()
    }

    pub fn clear(&mut self) {
        self.combos.clear();
        self.watches.clear();
    }
}
