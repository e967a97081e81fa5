use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no tokio runtime is running; the engine needs one for its timers")]
    NoRuntime,

    #[error("engine has been disposed")]
    Disposed,

    #[error("combo {combo:?} does not name a key")]
    EmptyCombo { combo: String },
}
