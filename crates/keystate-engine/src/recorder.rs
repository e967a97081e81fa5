//! Macro recording and timing-faithful playback
//!
//! The [`Recorder`] taps raw keydown events independently of the combo
//! registry: while recording, every keydown is stored with its offset from the
//! start of the recording. Stopping produces an immutable [`RecordedMacro`].
//!
//! Playback never injects input. [`Recorder::play_macro`] walks the macro,
//! logs each step, hands it to a caller-supplied sink, and sleeps for the gap
//! between consecutive timestamps. Starting a new playback (or calling
//! [`Recorder::stop_playback`]) aborts the one in flight; the check happens
//! before each step, so an abort never interrupts a step half way.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::event::ModifierFlags;

/// One recorded keydown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedKeyEvent {
    /// Raw key lowercased (not combo-normalized)
    pub key: String,
    /// Milliseconds since recording started
    pub timestamp_ms: u64,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl fmt::Display for RecordedKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (held, name) in [
            (self.ctrl, "Ctrl"),
            (self.shift, "Shift"),
            (self.alt, "Alt"),
            (self.meta, "Meta"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&self.key)
    }
}

/// A finished recording. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedMacro {
    keys: Vec<RecordedKeyEvent>,
    duration_ms: u64,
}

impl RecordedMacro {
    pub fn new(keys: Vec<RecordedKeyEvent>, duration: Duration) -> Self {
        Self {
            keys,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn keys(&self) -> &[RecordedKeyEvent] {
        &self.keys
    }

    /// Total recording time, from start to stop.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// How a call to [`Recorder::play_macro`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    /// Superseded by a newer playback or stopped explicitly
    Aborted,
}

#[derive(Debug, Default)]
struct RecorderState {
    started_at: Option<Instant>,
    events: Vec<RecordedKeyEvent>,
    last_macro: Option<Arc<RecordedMacro>>,
}

#[derive(Debug, Default)]
pub struct Recorder {
    state: Mutex<RecorderState>,
    playback_generation: AtomicU64,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a fresh recording, discarding any previous macro.
    pub fn start_recording(&self) {
        let mut state = self.lock();
        state.started_at = Some(Instant::now());
        state.events.clear();
        state.last_macro = None;
        tracing::debug!("Macro recording started");
    }

    /// Stop recording and return the macro, or `None` if not recording.
    pub fn stop_recording(&self) -> Option<Arc<RecordedMacro>> {
        let mut state = self.lock();
        let started_at = state.started_at.take()?;

        let keys = std::mem::take(&mut state.events);
        let recorded = Arc::new(RecordedMacro::new(keys, started_at.elapsed()));
        state.last_macro = Some(recorded.clone());

        tracing::debug!(
            "Macro recording stopped: {} key(s) over {}ms",
            recorded.len(),
            recorded.duration_ms
        );
        Some(recorded)
    }

    pub fn is_recording(&self) -> bool {
        self.lock().started_at.is_some()
    }

    /// The macro produced by the last [`Recorder::stop_recording`], if kept.
    pub fn recorded_macro(&self) -> Option<Arc<RecordedMacro>> {
        self.lock().last_macro.clone()
    }

    /// Forget recorded events and the last macro. A running recording keeps going.
    pub fn clear_recording(&self) {
        let mut state = self.lock();
        state.events.clear();
        state.last_macro = None;
    }

    /// Append a keydown if recording.
    pub fn capture(&self, raw_key: &str, modifiers: ModifierFlags) {
        let mut state = self.lock();
        let Some(started_at) = state.started_at else {
            return;
        };

        let event = RecordedKeyEvent {
            key: raw_key.to_lowercase(),
            timestamp_ms: started_at.elapsed().as_millis() as u64,
            ctrl: modifiers.ctrl,
            shift: modifiers.shift,
            alt: modifiers.alt,
            meta: modifiers.meta,
        };
        tracing::trace!("Recorded {} at {}ms", event, event.timestamp_ms);
        state.events.push(event);
    }

    /// Abort any playback in flight.
    pub fn stop_playback(&self) {
        self.playback_generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Stop recording, drop everything recorded, abort playback.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.started_at = None;
            state.events.clear();
            state.last_macro = None;
        }
        self.stop_playback();
    }

    /// Replay `recorded`, handing each step to `sink` with the original
    /// spacing between steps.
    pub async fn play_macro<F>(&self, recorded: &RecordedMacro, mut sink: F) -> PlaybackOutcome
    where
        F: FnMut(&RecordedKeyEvent),
    {
        let generation = self.playback_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let keys = recorded.keys();

        for (i, event) in keys.iter().enumerate() {
            if self.playback_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("Playback aborted before step {}", i);
                return PlaybackOutcome::Aborted;
            }

            tracing::info!("[Playback {}ms] {}", event.timestamp_ms, event);
            sink(event);

            if let Some(next) = keys.get(i + 1) {
                let gap = next.timestamp_ms.saturating_sub(event.timestamp_ms);
                tokio::time::sleep(Duration::from_millis(gap)).await;
            }
        }

        PlaybackOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> ModifierFlags {
        ModifierFlags {
            ctrl: true,
            ..ModifierFlags::default()
        }
    }

    fn step(key: &str, timestamp_ms: u64) -> RecordedKeyEvent {
        RecordedKeyEvent {
            key: key.to_string(),
            timestamp_ms,
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_with_relative_timestamps() {
        let recorder = Recorder::new();
        recorder.start_recording();
        assert!(recorder.is_recording());

        recorder.capture("H", ModifierFlags::default());
        tokio::time::advance(Duration::from_millis(120)).await;
        recorder.capture("s", ctrl());
        tokio::time::advance(Duration::from_millis(30)).await;

        let recorded = recorder.stop_recording().expect("was recording");
        assert!(!recorder.is_recording());
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded.keys()[0].key, "h", "raw key is lowercased");
        assert_eq!(recorded.keys()[0].timestamp_ms, 0);
        assert_eq!(recorded.keys()[1].timestamp_ms, 120);
        assert!(recorded.keys()[1].ctrl);
        assert_eq!(recorded.duration(), Duration::from_millis(150));
        assert_eq!(recorder.recorded_macro().as_deref(), Some(&*recorded));
    }

    #[test]
    fn test_stop_without_recording_is_none() {
        let recorder = Recorder::new();
        assert!(recorder.stop_recording().is_none());
    }

    #[test]
    fn test_capture_ignored_when_not_recording() {
        let recorder = Recorder::new();
        recorder.capture("a", ModifierFlags::default());
        recorder.start_recording();
        let recorded = recorder.stop_recording().unwrap();
        assert!(recorded.is_empty());
    }

    #[test]
    fn test_raw_space_is_not_normalized() {
        let recorder = Recorder::new();
        recorder.start_recording();
        recorder.capture(" ", ModifierFlags::default());
        let recorded = recorder.stop_recording().unwrap();
        assert_eq!(recorded.keys()[0].key, " ");
    }

    #[test]
    fn test_clear_recording_drops_macro() {
        let recorder = Recorder::new();
        recorder.start_recording();
        recorder.stop_recording();
        assert!(recorder.recorded_macro().is_some());
        recorder.clear_recording();
        assert!(recorder.recorded_macro().is_none());
    }

    #[test]
    fn test_display_lists_modifiers_in_order() {
        let mut event = step("p", 0);
        event.shift = true;
        event.ctrl = true;
        assert_eq!(event.to_string(), "Ctrl+Shift+p");
        assert_eq!(step("a", 0).to_string(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_preserves_gaps() {
        let recorder = Recorder::new();
        let recorded = RecordedMacro::new(
            vec![step("a", 0), step("b", 250), step("c", 400)],
            Duration::from_millis(500),
        );

        let start = Instant::now();
        let mut seen = Vec::new();
        let outcome = recorder
            .play_macro(&recorded, |e| seen.push((e.key.clone(), start.elapsed())))
            .await;

        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), Duration::ZERO),
                ("b".to_string(), Duration::from_millis(250)),
                ("c".to_string(), Duration::from_millis(400)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_playback_aborts_previous() {
        let recorder = Arc::new(Recorder::new());
        let recorded = Arc::new(RecordedMacro::new(
            vec![step("a", 0), step("b", 1000), step("c", 2000)],
            Duration::from_millis(2000),
        ));

        let first = {
            let recorder = recorder.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let mut steps = 0;
                let outcome = recorder.play_macro(&recorded, |_| steps += 1).await;
                (outcome, steps)
            })
        };

        // Let the first playback emit its first step and start waiting
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut second_steps = 0;
        let outcome = recorder
            .play_macro(&recorded, |_| second_steps += 1)
            .await;
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(second_steps, 3);

        let (first_outcome, first_steps) = first.await.unwrap();
        assert_eq!(first_outcome, PlaybackOutcome::Aborted);
        assert_eq!(first_steps, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_playback() {
        let recorder = Arc::new(Recorder::new());
        let recorded = RecordedMacro::new(vec![step("a", 0), step("b", 100)], Duration::ZERO);

        let handle = {
            let recorder = recorder.clone();
            tokio::spawn(async move { recorder.play_macro(&recorded, |_| {}).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        recorder.stop_playback();

        assert_eq!(handle.await.unwrap(), PlaybackOutcome::Aborted);
    }
}
