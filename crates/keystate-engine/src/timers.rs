//! Cancellable timer bookkeeping
//!
//! Every delayed action in the engine (hold timers, the sequence idle reset,
//! the focus guard, the snapshot flush) is a spawned tokio task registered in
//! a [`TimerSet`] under a stable [`TimerKey`]. Arming a key that is already
//! armed aborts the old task first, so there is at most one pending timer per
//! key.
//!
//! Aborting a task only takes effect at its next await point. A timer that has
//! already woken and is waiting for the engine lock would otherwise still run,
//! so each arm gets a generation number and the task must call
//! [`TimerSet::complete`] under the lock before acting. If the key was
//! cancelled or re-armed in the meantime, `complete` returns `false` and the
//! task does nothing.

use std::collections::HashMap;

use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TimerKey {
    /// Hold timer for a combo key
    Hold(String),
    SequenceIdle,
    FocusGuard,
    /// Pending snapshot publish
    Flush,
}

pub(crate) type Generation = u64;

struct PendingTimer {
    generation: Generation,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub(crate) struct TimerSet {
    next_generation: Generation,
    pending: HashMap<TimerKey, PendingTimer>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key`, replacing any pending timer under it.
    ///
    /// `spawn` receives the generation the task must hand back to
    /// [`TimerSet::complete`].
    pub fn arm<F>(&mut self, key: TimerKey, spawn: F) -> Generation
    where
        F: FnOnce(Generation) -> JoinHandle<()>,
    {
        self.cancel(&key);
        self.next_generation += 1;
        let generation = self.next_generation;
        let handle = spawn(generation);
        self.pending.insert(key, PendingTimer { generation, handle });
        generation
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Cancel a pending timer. Returns whether one was pending.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        match self.pending.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a fired timer task. Clears the entry and returns `true` only
    /// if `generation` is still the armed one.
    pub fn complete(&mut self, key: &TimerKey, generation: Generation) -> bool {
        match self.pending.get(key) {
            Some(timer) if timer.generation == generation => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Cancel every pending timer whose key matches. Returns how many were
    /// pending.
    pub fn cancel_matching<P>(&mut self, mut matches: P) -> usize
    where
        P: FnMut(&TimerKey) -> bool,
    {
        let mut cancelled = 0;
        self.pending.retain(|key, timer| {
            if !matches(key) {
                return true;
            }
            timer.handle.abort();
            cancelled += 1;
            false
        });
        cancelled
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
