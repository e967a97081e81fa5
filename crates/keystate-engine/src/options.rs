//! Per-registration combo options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback fired by a combo, a sequence, or a hold/release transition.
pub type ComboCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback fired for a watched key; receives the normalized key.
pub type WatchCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Options controlling when and how a registered combo fires.
///
/// Defaults: `prevent_default = false`, `allow_in_editable = false`,
/// `enabled = true`, no scope classes, no hold, no hold/release callbacks.
#[derive(Clone)]
pub struct ComboOptions {
    /// Suppress the platform default action when the combo fires
    pub prevent_default: bool,
    /// Fire even when the event target is an editable control
    pub allow_in_editable: bool,
    pub enabled: bool,
    /// Scope classes (a leading `.` is ignored); empty means global
    pub classes: Vec<String>,
    /// Zero means "fire on press"; otherwise `on_hold` fires after this long
    pub hold_duration: Duration,
    pub on_hold: Option<ComboCallback>,
    pub on_release: Option<ComboCallback>,
}

impl Default for ComboOptions {
    fn default() -> Self {
        Self {
            prevent_default: false,
            allow_in_editable: false,
            enabled: true,
            classes: Vec::new(),
            hold_duration: Duration::ZERO,
            on_hold: None,
            on_release: None,
        }
    }
}

impl ComboOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = prevent;
        self
    }

    pub fn allow_in_editable(mut self, allow: bool) -> Self {
        self.allow_in_editable = allow;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Switch the combo to hold mode: `on_hold` fires once the key has been
    /// down for `duration`. The plain callback is not used in hold mode.
    pub fn on_hold<F>(mut self, duration: Duration, on_hold: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hold_duration = duration;
        self.on_hold = Some(Arc::new(on_hold));
        self
    }

    pub fn on_release<F>(mut self, on_release: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_release = Some(Arc::new(on_release));
        self
    }

    pub(crate) fn holds(&self) -> bool {
        !self.hold_duration.is_zero()
    }
}

impl fmt::Debug for ComboOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboOptions")
            .field("prevent_default", &self.prevent_default)
            .field("allow_in_editable", &self.allow_in_editable)
            .field("enabled", &self.enabled)
            .field("classes", &self.classes)
            .field("hold_duration", &self.hold_duration)
            .field("on_hold", &self.on_hold.is_some())
            .field("on_release", &self.on_release.is_some())
            .finish()
    }
}
