//! Register configured bindings with the engine

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use keystate_config::Binding;
use keystate_engine::{ComboOptions, Engine, Registration};

/// Fired-action sink, so tests can observe what the CLI would print.
pub type ActionSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for a configured binding. Hold bindings report `"<action> (held)"`
/// once the threshold passes, and `"<action> (released)"` on keyup.
pub fn binding_options(binding: &Binding, sink: &ActionSink) -> ComboOptions {
    let mut options = ComboOptions::new()
        .prevent_default(binding.prevent_default)
        .allow_in_editable(binding.allow_in_editable)
        .enabled(binding.enabled)
        .classes(binding.classes.iter().cloned());

    if binding.hold_ms > 0 {
        let held = format!("{} (held)", binding.action);
        let released = format!("{} (released)", binding.action);
        let hold_sink = sink.clone();
        let release_sink = sink.clone();

        options = options
            .on_hold(Duration::from_millis(binding.hold_ms), move || hold_sink(&held))
            .on_release(move || release_sink(&released));
    }
    options
}

pub fn register_bindings(
    engine: &Engine,
    bindings: &[Binding],
    sink: ActionSink,
) -> Result<Vec<Registration>> {
    let mut registrations = Vec::with_capacity(bindings.len());

    for binding in bindings {
        let options = binding_options(binding, &sink);
        let action = binding.action.clone();
        let fire_sink = sink.clone();

        let registration = engine
            .register_combo(binding.combo.as_str(), move || fire_sink(&action), options)
            .with_context(|| format!("Failed to register binding '{}'", binding.combo))?;

        tracing::info!("Bound {} -> {}", registration.key(), binding.action);
        registrations.push(registration);
    }

    Ok(registrations)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use keystate_engine::{EngineConfig, KeyEvent};

    use super::*;

    fn recording_sink() -> (Arc<Mutex<Vec<String>>>, ActionSink) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let f = fired.clone();
        let sink: ActionSink = Arc::new(move |action: &str| f.lock().unwrap().push(action.to_string()));
        (fired, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_bindings_fire_their_action() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (fired, sink) = recording_sink();
        let bindings = vec![
            Binding::new("ctrl+s", "save"),
            Binding::new("g i", "goto-inbox"),
        ];

        let regs = register_bindings(&engine, &bindings, sink).unwrap();
        assert_eq!(regs.len(), 2);

        engine.key_down(&KeyEvent::new("s").with_ctrl());
        engine.key_down(&KeyEvent::new("g"));
        engine.key_down(&KeyEvent::new("i"));

        assert_eq!(*fired.lock().unwrap(), vec!["save", "goto-inbox"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_binding_is_registered_but_silent() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (fired, sink) = recording_sink();
        let mut binding = Binding::new("x", "nothing");
        binding.enabled = false;

        let regs = register_bindings(&engine, &[binding], sink).unwrap();
        assert!(regs[0].is_active());

        engine.key_down(&KeyEvent::new("x"));
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_binding_reports_hold_and_release() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (fired, sink) = recording_sink();
        let mut binding = Binding::new("space", "push-to-talk");
        binding.hold_ms = 300;

        let _regs = register_bindings(&engine, &[binding], sink).unwrap();

        engine.key_down(&KeyEvent::new(" "));
        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.key_up(&KeyEvent::new(" "));

        assert_eq!(
            *fired.lock().unwrap(),
            vec!["push-to-talk (held)", "push-to-talk (released)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_combo_is_reported() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (_fired, sink) = recording_sink();
        let err = register_bindings(&engine, &[Binding::new("", "broken")], sink).unwrap_err();
        assert!(err.to_string().contains("Failed to register binding"));
    }
}
