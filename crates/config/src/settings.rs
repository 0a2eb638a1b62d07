//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode, relaxed validation
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode, all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Room join options
    #[serde(default)]
    pub room: RoomSettings,

    /// Speech-to-text stage
    #[serde(default)]
    pub stt: SttSettings,

    /// Language-model stage
    #[serde(default)]
    pub llm: LlmSettings,

    /// Text-to-speech stage
    #[serde(default)]
    pub tts: TtsSettings,

    /// Voice-activity-detection stage
    #[serde(default)]
    pub vad: VadSettings,

    /// Turn-detection stage
    #[serde(default)]
    pub turn_detection: TurnSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Room join options.
///
/// When `room_id` is absent a fresh room is created at connect time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Pre-created room to join; auto-create when absent
    #[serde(default)]
    pub room_id: Option<String>,

    /// Display name shown to room participants
    #[serde(default = "default_room_name")]
    pub name: String,

    /// Log a playground URL after joining
    #[serde(default = "default_true")]
    pub playground: bool,
}

fn default_room_name() -> String {
    "Cascade Agent for conversational ai for automotive".to_string()
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            room_id: None,
            name: default_room_name(),
            playground: true,
        }
    }
}

/// Speech-to-text stage settings (Deepgram)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Recognition model
    #[serde(default = "default_stt_model")]
    pub model: String,

    /// BCP-47 language tag
    #[serde(default = "default_stt_language")]
    pub language: String,
}

fn default_stt_model() -> String {
    "nova-2".to_string()
}
fn default_stt_language() -> String {
    "en".to_string()
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model: default_stt_model(),
            language: default_stt_language(),
        }
    }
}

/// Language-model stage settings (OpenAI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Chat model
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum tokens per response
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}
fn default_llm_max_tokens() -> usize {
    512
}
fn default_llm_temperature() -> f32 {
    0.7
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
        }
    }
}

/// Text-to-speech stage settings (ElevenLabs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Synthesis model
    #[serde(default = "default_tts_model")]
    pub model: String,

    /// Voice identifier
    #[serde(default = "default_tts_voice")]
    pub voice_id: String,
}

fn default_tts_model() -> String {
    "eleven_flash_v2_5".to_string()
}
fn default_tts_voice() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            model: default_tts_model(),
            voice_id: default_tts_voice(),
        }
    }
}

/// Voice-activity-detection stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    /// Speech probability threshold in [0.0, 1.0]
    #[serde(default = "default_vad_threshold")]
    pub threshold: f32,

    /// Consecutive speech required to confirm speech start (ms)
    #[serde(default = "default_min_speech_ms")]
    pub min_speech_duration_ms: u32,

    /// Consecutive silence required to confirm speech end (ms)
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_duration_ms: u32,
}

fn default_vad_threshold() -> f32 {
    0.35
}
fn default_min_speech_ms() -> u32 {
    200
}
fn default_min_silence_ms() -> u32 {
    320
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            threshold: default_vad_threshold(),
            min_speech_duration_ms: default_min_speech_ms(),
            min_silence_duration_ms: default_min_silence_ms(),
        }
    }
}

/// Turn-detection stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSettings {
    /// Completion confidence threshold in [0.0, 1.0]
    #[serde(default = "default_turn_threshold")]
    pub threshold: f32,

    /// Base silence window before a pause is evaluated (ms)
    #[serde(default = "default_base_silence_ms")]
    pub base_silence_ms: u32,

    /// Upper bound for the dynamic silence window (ms)
    #[serde(default = "default_max_silence_ms")]
    pub max_silence_ms: u32,
}

fn default_turn_threshold() -> f32 {
    0.8
}
fn default_base_silence_ms() -> u32 {
    600
}
fn default_max_silence_ms() -> u32 {
    1600
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            threshold: default_turn_threshold(),
            base_silence_ms: default_base_silence_ms(),
            max_silence_ms: default_max_silence_ms(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
            metrics_port: default_metrics_port(),
        }
    }
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_stages()?;
        self.validate_room()?;
        Ok(())
    }

    fn validate_stages(&self) -> Result<(), ConfigError> {
        if self.stt.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "stt.model".to_string(),
                message: "model name cannot be empty".to_string(),
            });
        }
        if self.stt.language.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "stt.language".to_string(),
                message: "language tag cannot be empty".to_string(),
            });
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "llm.model".to_string(),
                message: "model name cannot be empty".to_string(),
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }
        if self.tts.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tts.model".to_string(),
                message: "model name cannot be empty".to_string(),
            });
        }
        if self.tts.voice_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tts.voice_id".to_string(),
                message: "voice id cannot be empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.vad.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "vad.threshold".to_string(),
                message: format!("must be between 0.0 and 1.0, got {}", self.vad.threshold),
            });
        }
        if !(0.0..=1.0).contains(&self.turn_detection.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "turn_detection.threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.turn_detection.threshold
                ),
            });
        }
        if self.turn_detection.base_silence_ms > self.turn_detection.max_silence_ms {
            return Err(ConfigError::InvalidValue {
                field: "turn_detection.base_silence_ms".to_string(),
                message: format!(
                    "cannot exceed max_silence_ms ({})",
                    self.turn_detection.max_silence_ms
                ),
            });
        }
        Ok(())
    }

    fn validate_room(&self) -> Result<(), ConfigError> {
        if self.room.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "room.name".to_string(),
                message: "display name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`CASCADE__` prefix, `__` separator)
/// 2. `config/{env}.yaml` (if env specified)
/// 3. `config/default.yaml`
/// 4. Built-in defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CASCADE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_defaults_match_configured_literals() {
        let settings = Settings::default();
        assert_eq!(settings.stt.model, "nova-2");
        assert_eq!(settings.stt.language, "en");
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.tts.model, "eleven_flash_v2_5");
        assert!((settings.vad.threshold - 0.35).abs() < f32::EPSILON);
        assert!((settings.turn_detection.threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn room_defaults() {
        let settings = Settings::default();
        assert!(settings.room.room_id.is_none());
        assert!(settings.room.playground);
        assert!(settings.room.name.contains("automotive"));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut settings = Settings::default();
        settings.vad.threshold = 1.5;
        assert!(settings.validate().is_err());

        settings.vad.threshold = 0.35;
        settings.turn_detection.threshold = -0.1;
        assert!(settings.validate().is_err());

        settings.turn_detection.threshold = 0.8;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn empty_model_names_rejected() {
        let mut settings = Settings::default();
        settings.stt.model = String::new();
        assert!(settings.validate().is_err());

        settings.stt.model = "nova-2".to_string();
        settings.llm.model = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn silence_window_ordering_enforced() {
        let mut settings = Settings::default();
        settings.turn_detection.base_silence_ms = 2000;
        settings.turn_detection.max_silence_ms = 1000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn llm_bounds() {
        let mut settings = Settings::default();
        settings.llm.max_tokens = 0;
        assert!(settings.validate().is_err());

        settings.llm.max_tokens = 512;
        settings.llm.temperature = 3.0;
        assert!(settings.validate().is_err());
    }
}
