//! Configuration parsing for keystate
//!
//! This crate handles parsing the KDL configuration file that tunes the
//! keyboard-state engine timings and declares the combo bindings the CLI
//! registers at startup.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
