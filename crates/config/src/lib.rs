//! Configuration for the cascading voice agent
//!
//! Settings are layered: built-in defaults, then `config/default.yaml`, then
//! an environment-specific file, then `CASCADE__`-prefixed environment
//! variables. Stage defaults carry the agent's configured model identifiers
//! and detection thresholds.

mod settings;

pub use settings::{
    load_settings, LlmSettings, ObservabilityConfig, RoomSettings, RuntimeEnvironment, Settings,
    SttSettings, TtsSettings, TurnSettings, VadSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
