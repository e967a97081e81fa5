//! The keyboard-state engine
//!
//! One [`Engine`] owns the live [`KeyState`], the combo/watch registry, the
//! sequence buffer and every pending timer. Platform adapters feed it
//! keydown/keyup and focus notifications; consumers read snapshots and
//! register callbacks.
//!
//! ```text
//! keydown ─┬─> recorder tap
//!          ├─> state update ──> focus guard (alt/meta alone) ──> flush
//!          ├─> key watchers
//!          ├─> combo match ──> fire now, or arm a hold timer
//!          └─> sequence match ──> fire, or prune and arm the idle reset
//!
//! keyup ───┬─> state update ──> flush
//!          ├─> cancel hold timers that need the released key
//!          └─> on_release
//!
//! flush (after one frame) ──> publish the snapshot if it changed
//! ```
//!
//! All mutable state sits behind one mutex. Callbacks are always invoked with
//! the lock released, so a callback may register, unregister or dispatch
//! further events without deadlocking. Timers are tokio tasks spawned on the
//! runtime that created the engine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use keystate_config::TimingConfig;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::combo::{create_combo_key, parse_combo, ComboInput, KeyCombo, Modifier};
use crate::error::EngineError;
use crate::event::{FocusEvent, ModifierFlags, PlatformKeyEvent};
use crate::keys::{normalize_key, ALT, META};
use crate::options::{ComboCallback, ComboOptions};
use crate::recorder::Recorder;
use crate::registry::{Registry, RegistrationId};
use crate::scope;
use crate::sequence::SequenceBuffer;
use crate::state::{KeyQuery, KeyState};
use crate::timers::{TimerKey, TimerSet};

/// Timing knobs for an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay before a state change is published to subscribers
    pub frame_interval: Duration,
    /// Idle time after which a partial key sequence is dropped
    pub sequence_timeout: Duration,
    /// How long a lone alt/meta keydown may go without its keyup
    pub focus_guard: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            sequence_timeout: Duration::from_millis(1000),
            focus_guard: Duration::from_millis(100),
        }
    }
}

impl From<&TimingConfig> for EngineConfig {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            frame_interval: Duration::from_millis(timing.frame_interval_ms),
            sequence_timeout: Duration::from_millis(timing.sequence_timeout_ms),
            focus_guard: Duration::from_millis(timing.focus_guard_ms),
        }
    }
}

struct Inner {
    disposed: bool,
    state: KeyState,
    registry: Registry,
    sequence: SequenceBuffer,
    timers: TimerSet,
    publish_count: u64,
}

struct Shared {
    config: EngineConfig,
    runtime: Handle,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<KeyState>,
    recorder: Recorder,
}

/// Handle to a running keyboard-state engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm `key` to run `on_fire` under the lock after `delay`. A callback
    /// returned by `on_fire` is invoked after the lock is released.
    fn arm_timer<F>(self: &Arc<Self>, inner: &mut Inner, key: TimerKey, delay: Duration, on_fire: F)
    where
        F: FnOnce(&Arc<Shared>, &mut Inner) -> Option<ComboCallback> + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        let timer_key = key.clone();
        let runtime = &self.runtime;

        inner.timers.arm(key, |generation| {
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let Some(shared) = weak.upgrade() else {
                    return;
                };

                let callback = {
                    let mut inner = shared.lock();
                    if !inner.timers.complete(&timer_key, generation) {
                        return;
                    }
                    on_fire(&shared, &mut *inner)
                };

                if let Some(callback) = callback {
                    callback();
                }
            })
        });
    }

    /// Publish the live state after one frame. Coalesces: while a flush is
    /// pending, further changes ride along with it.
    fn schedule_flush(self: &Arc<Self>, inner: &mut Inner) {
        if inner.timers.is_armed(&TimerKey::Flush) {
            return;
        }
        self.arm_timer(inner, TimerKey::Flush, self.config.frame_interval, |shared, inner| {
            shared.publish(inner);
            None
        });
    }

    fn publish(&self, inner: &mut Inner) {
        let snapshot = inner.state.clone();
        let changed = self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        if changed {
            inner.publish_count += 1;
            tracing::trace!("Published key state snapshot #{}", inner.publish_count);
        }
    }

    fn arm_focus_guard(self: &Arc<Self>, inner: &mut Inner) {
        self.arm_timer(inner, TimerKey::FocusGuard, self.config.focus_guard, |shared, inner| {
            tracing::debug!("No keyup for alt/meta, assuming focus was lost; releasing all keys");
            shared.reset_held_keys(inner);
            None
        });
    }

    /// Release every key and cancel every pending hold.
    fn reset_held_keys(self: &Arc<Self>, inner: &mut Inner) {
        inner.timers.cancel(&TimerKey::FocusGuard);
        let holds = inner
            .timers
            .cancel_matching(|key| matches!(key, TimerKey::Hold(_)));
        if holds > 0 {
            tracing::debug!("Cancelled {} pending hold timer(s)", holds);
        }
        inner.state.release_all();
        self.schedule_flush(inner);
    }

    /// Combo lookup for a keydown. Returns the callback to fire, if any.
    fn match_combo<E>(
        self: &Arc<Self>,
        event: &E,
        key: &str,
        modifiers: ModifierFlags,
    ) -> Option<ComboCallback>
    where
        E: PlatformKeyEvent + ?Sized,
    {
        let combo_key = create_combo_key(&combo_from_event(key, modifiers));

        let mut inner = self.lock();
        if inner.disposed {
            return None;
        }

        let (callback, options) = match inner.registry.combo(&combo_key) {
            Some(entry) => (entry.callback.clone(), entry.options.clone()),
            None => return None,
        };

        if !options.enabled || !scope::allows(event, &options) {
            tracing::trace!("Combo {} matched but is disabled or out of scope", combo_key);
            return None;
        }

        if options.prevent_default {
            event.prevent_default();
        }

        if options.holds() {
            let hold_key = TimerKey::Hold(combo_key.clone());
            if !event.is_repeat() && !inner.timers.is_armed(&hold_key) {
                tracing::debug!(
                    "Arming {}ms hold timer for {}",
                    options.hold_duration.as_millis(),
                    combo_key
                );
                let on_hold = options.on_hold;
                self.arm_timer(&mut inner, hold_key, options.hold_duration, move |_, _| {
                    on_hold
                });
            }
            return None;
        }

        if event.is_repeat() {
            return None;
        }

        tracing::debug!("Combo matched: {}", combo_key);
        Some(callback)
    }

    /// Sequence handling for a keydown. Returns the callback to fire, if any.
    fn match_sequence<E>(
        self: &Arc<Self>,
        event: &E,
        key: &str,
        modifiers: ModifierFlags,
    ) -> Option<ComboCallback>
    where
        E: PlatformKeyEvent + ?Sized,
    {
        if !SequenceBuffer::qualifies(key, modifiers) {
            return None;
        }

        let mut inner = self.lock();
        if inner.disposed {
            return None;
        }
        inner.timers.cancel(&TimerKey::SequenceIdle);

        let Inner {
            sequence, registry, ..
        } = &mut *inner;

        if let Some(candidate) = sequence.push(key, registry) {
            if let Some(entry) = registry.combo(&candidate) {
                if entry.options.enabled && scope::allows(event, &entry.options) {
                    if entry.options.prevent_default {
                        event.prevent_default();
                    }
                    tracing::debug!("Sequence matched: {}", candidate);
                    let callback = entry.callback.clone();
                    sequence.clear();
                    return Some(callback);
                }
            }
        }

        sequence.prune(registry);
        let pending = !sequence.is_empty();

        if pending {
            self.arm_timer(
                &mut inner,
                TimerKey::SequenceIdle,
                self.config.sequence_timeout,
                |_, inner| {
                    tracing::trace!("Sequence idle, clearing {:?}", inner.sequence.keys());
                    inner.sequence.clear();
                    None
                },
            );
        }
        None
    }
}

fn combo_from_event(key: &str, modifiers: ModifierFlags) -> KeyCombo {
    KeyCombo {
        ctrl: modifiers.ctrl,
        shift: modifiers.shift,
        alt: modifiers.alt,
        meta: modifiers.meta,
        key: key.to_string(),
    }
}

impl Engine {
    /// Start an engine on the current tokio runtime.
    ///
    /// Fails with [`EngineError::NoRuntime`] outside a runtime; timers need one.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (snapshots, _) = watch::channel(KeyState::default());

        tracing::debug!("Keyboard state engine started with {:?}", config);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                runtime,
                inner: Mutex::new(Inner {
                    disposed: false,
                    state: KeyState::default(),
                    registry: Registry::new(),
                    sequence: SequenceBuffer::new(),
                    timers: TimerSet::new(),
                    publish_count: 0,
                }),
                snapshots,
                recorder: Recorder::new(),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Tear the engine down: cancel every timer, drop every registration and
    /// abort playback. Later events are ignored and registration fails with
    /// [`EngineError::Disposed`].
    pub fn dispose(&self) {
        {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.timers.cancel_all();
            inner.registry.clear();
            inner.sequence.clear();
        }
        self.shared.recorder.reset();
        tracing::debug!("Keyboard state engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Feed a keydown.
    pub fn key_down<E>(&self, event: &E)
    where
        E: PlatformKeyEvent + ?Sized,
    {
        let Some(modifiers) = event.modifiers() else {
            tracing::trace!("Ignoring keydown without modifier state: {:?}", event.key());
            return;
        };
        let key = normalize_key(event.key());
        let shared = &self.shared;

        let watchers = {
            let mut inner = shared.lock();
            if inner.disposed {
                return;
            }

            shared.recorder.capture(event.key(), modifiers);
            inner.state.apply_key_down(&key, modifiers);

            if (key == ALT || key == META) && !modifiers.ctrl && !modifiers.shift {
                shared.arm_focus_guard(&mut inner);
            }
            shared.schedule_flush(&mut inner);

            inner.registry.watchers(&key)
        };

        if !watchers.is_empty() {
            if key == "backspace" || key == "tab" {
                event.prevent_default();
            }
            for watcher in &watchers {
                watcher(&key);
            }
        }

        if let Some(callback) = shared.match_combo(event, &key, modifiers) {
            callback();
        }

        if let Some(callback) = shared.match_sequence(event, &key, modifiers) {
            callback();
        }
    }

    /// Feed a keyup.
    pub fn key_up<E>(&self, event: &E)
    where
        E: PlatformKeyEvent + ?Sized,
    {
        let Some(modifiers) = event.modifiers() else {
            tracing::trace!("Ignoring keyup without modifier state: {:?}", event.key());
            return;
        };
        let key = normalize_key(event.key());
        let shared = &self.shared;

        let on_release = {
            let mut inner = shared.lock();
            if inner.disposed {
                return;
            }

            inner.state.apply_key_up(&key, modifiers);
            if key == ALT || key == META {
                inner.timers.cancel(&TimerKey::FocusGuard);
            }
            shared.schedule_flush(&mut inner);

            let combo_key = create_combo_key(&combo_from_event(&key, modifiers));
            let released = inner.timers.cancel_matching(|timer| match timer {
                TimerKey::Hold(held) => hold_depends_on(held, &key),
                _ => false,
            });
            if released > 0 {
                tracing::debug!("Released {} before hold threshold", key);
            }

            inner
                .registry
                .combo(&combo_key)
                .filter(|entry| entry.options.enabled && scope::allows(event, &entry.options))
                .and_then(|entry| entry.options.on_release.clone())
        };

        if let Some(on_release) = on_release {
            on_release();
        }
    }

    /// Feed a window focus or visibility notification.
    ///
    /// Blur, focus and becoming hidden all mean keyups may have been missed,
    /// so held keys and modifiers are released. Caps lock and the last
    /// pressed key are kept.
    pub fn focus_event(&self, event: FocusEvent) {
        if !event.resets_state() {
            return;
        }

        let mut inner = self.shared.lock();
        if inner.disposed {
            return;
        }
        tracing::debug!("{:?}: releasing all held keys", event);
        self.shared.reset_held_keys(&mut inner);
    }

    /// Register a combo or a space-separated key sequence.
    ///
    /// A later registration under the same combo key replaces this one.
    pub fn register_combo<C, F>(
        &self,
        combo: C,
        callback: F,
        options: ComboOptions,
    ) -> Result<Registration, EngineError>
    where
        C: Into<ComboInput>,
        F: Fn() + Send + Sync + 'static,
    {
        self.insert_combo(combo.into(), Arc::new(callback), options)
    }

    fn insert_combo(
        &self,
        input: ComboInput,
        callback: ComboCallback,
        options: ComboOptions,
    ) -> Result<Registration, EngineError> {
        let parsed = parse_combo(&input);
        let combo_key = create_combo_key(&parsed);
        if normalize_key(&parsed.key).is_empty() {
            return Err(EngineError::EmptyCombo { combo: combo_key });
        }

        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(EngineError::Disposed);
        }

        let inserted = inner
            .registry
            .insert_combo(combo_key.clone(), callback, options);
        if inserted.replaced {
            tracing::warn!(
                "Duplicate keyboard shortcut detected: \"{}\". This will override the previous registration.",
                combo_key
            );
            inner.timers.cancel(&TimerKey::Hold(combo_key.clone()));
        } else {
            tracing::debug!("Registered combo {}", combo_key);
        }

        Ok(Registration::new(
            &self.shared,
            Target::Combo {
                combo_key,
                id: inserted.id,
            },
        ))
    }

    /// Register several combos at once. If one fails, the ones already
    /// registered by this call are unregistered again.
    pub fn register_shortcuts<I>(&self, shortcuts: I) -> Result<Vec<Registration>, EngineError>
    where
        I: IntoIterator<Item = Shortcut>,
    {
        let mut registrations = Vec::new();
        for shortcut in shortcuts {
            match self.insert_combo(shortcut.combo, shortcut.callback, shortcut.options) {
                Ok(registration) => registrations.push(registration),
                Err(err) => {
                    for registration in &registrations {
                        registration.unregister();
                    }
                    return Err(err);
                }
            }
        }
        Ok(registrations)
    }

    /// Call `callback` with the normalized key on every keydown of `key`,
    /// modifiers or not. Several watchers per key run in registration order.
    pub fn register_watch<F>(&self, key: &str, callback: F) -> Result<Registration, EngineError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(EngineError::EmptyCombo { combo: key });
        }

        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(EngineError::Disposed);
        }
        let id = inner.registry.insert_watch(key.clone(), Arc::new(callback));
        tracing::debug!("Watching key {}", key);

        Ok(Registration::new(&self.shared, Target::Watch { key, id }))
    }

    /// Receiver of published snapshots. Its initial value is the last
    /// published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<KeyState> {
        self.shared.snapshots.subscribe()
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> KeyState {
        self.shared.snapshots.borrow().clone()
    }

    /// The live state, including changes not yet published.
    pub fn state(&self) -> KeyState {
        self.shared.lock().state.clone()
    }

    /// Exact-match test against the live state; a list means all must be held.
    pub fn is_key_pressed(&self, query: impl Into<KeyQuery>) -> bool {
        self.shared.lock().state.is_key_pressed(query)
    }

    /// Number of snapshots actually published so far.
    pub fn publish_count(&self) -> u64 {
        self.shared.lock().publish_count
    }

    /// Keys of the sequence currently being typed.
    pub fn sequence_buffer(&self) -> Vec<String> {
        self.shared.lock().sequence.keys().to_vec()
    }

    /// Number of registered combos and sequences.
    pub fn combo_count(&self) -> usize {
        self.shared.lock().registry.combo_count()
    }

    pub fn is_watched(&self, key: &str) -> bool {
        self.shared.lock().registry.is_watched(&normalize_key(key))
    }

    /// Number of armed timers (hold, sequence idle, focus guard, flush).
    pub fn pending_timers(&self) -> usize {
        self.shared.lock().timers.len()
    }

    /// The macro recorder fed by this engine's keydowns.
    pub fn recorder(&self) -> &Recorder {
        &self.shared.recorder
    }
}

/// Whether a hold armed under `combo_key` needs `released` to stay down:
/// either it is the combo's key or one of its modifiers.
fn hold_depends_on(combo_key: &str, released: &str) -> bool {
    let mut rest = combo_key;
    for modifier in [Modifier::Ctrl, Modifier::Shift, Modifier::Alt, Modifier::Meta] {
        let tail = rest
            .strip_prefix(modifier.token())
            .and_then(|tail| tail.strip_prefix('+'));
        if let Some(tail) = tail {
            if modifier.key_name() == released {
                return true;
            }
            rest = tail;
        }
    }
    rest == released
}

/// A combo, its callback and options, for [`Engine::register_shortcuts`].
pub struct Shortcut {
    combo: ComboInput,
    callback: ComboCallback,
    options: ComboOptions,
}

impl Shortcut {
    pub fn new<C, F>(combo: C, callback: F) -> Self
    where
        C: Into<ComboInput>,
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            combo: combo.into(),
            callback: Arc::new(callback),
            options: ComboOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ComboOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shortcut")
            .field("combo", &self.combo)
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Debug)]
enum Target {
    Combo {
        combo_key: String,
        id: RegistrationId,
    },
    Watch {
        key: String,
        id: RegistrationId,
    },
}

/// Handle returned by registration. Dropping it leaves the registration in
/// place; call [`Registration::unregister`] to remove it.
#[derive(Debug)]
#[must_use = "dropping a Registration keeps the callback registered; call `unregister` to remove it"]
pub struct Registration {
    shared: Weak<Shared>,
    target: Target,
    active: AtomicBool,
}

impl Registration {
    fn new(shared: &Arc<Shared>, target: Target) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            target,
            active: AtomicBool::new(true),
        }
    }

    /// Combo key or watched key this registration was made under.
    pub fn key(&self) -> &str {
        match &self.target {
            Target::Combo { combo_key, .. } => combo_key,
            Target::Watch { key, .. } => key,
        }
    }

    /// Remove the registration. Idempotent; a combo that has since been
    /// replaced by a newer registration is left alone.
    pub fn unregister(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let mut inner = shared.lock();
        match &self.target {
            Target::Combo { combo_key, id } => {
                if inner.registry.remove_combo(combo_key, *id) {
                    inner.timers.cancel(&TimerKey::Hold(combo_key.clone()));
                    tracing::debug!("Unregistered combo {}", combo_key);
                }
            }
            Target::Watch { key, id } => {
                if inner.registry.remove_watch(key, *id) {
                    tracing::debug!("Stopped watching key {}", key);
                }
            }
        }
    }

    /// Whether the registration is still in effect: not unregistered, not
    /// replaced, engine not disposed.
    pub fn is_active(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };

        let inner = shared.lock();
        match &self.target {
            Target::Combo { combo_key, id } => inner.registry.owns_combo(combo_key, *id),
            Target::Watch { key, id } => inner.registry.owns_watch(key, *id),
        }
    }

    /// Toggle a combo without unregistering it. Returns `false` when the
    /// registration is no longer active or is a key watch.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        let Target::Combo { combo_key, id } = &self.target else {
            return false;
        };
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };

        let mut inner = shared.lock();
        match inner.registry.combo_mut(combo_key, *id) {
            Some(entry) => {
                entry.options.enabled = enabled;
                if !enabled {
                    inner.timers.cancel(&TimerKey::Hold(combo_key.clone()));
                }
                true
            }
            None => false,
        }
    }
}
