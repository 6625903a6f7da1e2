use crate::error::ConfigError;
use crate::types::{AudioEncoding, RecognitionMetadata, RecognitionRequest};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub transcoder: TranscoderConfig,

    #[serde(default)]
    pub operation: OperationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognitionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_language")]
    pub language_code: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Declared rate for audio that is already remote. Local inputs always
    /// use the transcoder's output rate.
    #[serde(default)]
    pub sample_rate_hertz: Option<u32>,

    #[serde(default = "default_true")]
    pub enable_automatic_punctuation: bool,

    #[serde(default = "default_true")]
    pub enable_word_time_offsets: bool,

    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: String::new(),
            language_code: default_language(),
            encoding: default_encoding(),
            sample_rate_hertz: None,
            enable_automatic_punctuation: default_true(),
            enable_word_time_offsets: default_true(),
            metadata: MetadataConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_interaction_type")]
    pub interaction_type: String,

    #[serde(default = "default_microphone_distance")]
    pub microphone_distance: String,

    #[serde(default = "default_recording_device_type")]
    pub recording_device_type: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            interaction_type: default_interaction_type(),
            microphone_distance: default_microphone_distance(),
            recording_device_type: default_recording_device_type(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscoderConfig {
    #[serde(default = "default_transcoder_program")]
    pub program: String,

    #[serde(default = "default_transcoder_args")]
    pub args: Vec<String>,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: default_transcoder_program(),
            args: default_transcoder_args(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OperationConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: None,
        }
    }
}

impl OperationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bucket() -> String {
    "longscribe-temp-audio".to_string()
}

fn default_endpoint() -> String {
    "https://speech.googleapis.com".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_encoding() -> String {
    "FLAC".to_string()
}

fn default_true() -> bool {
    true
}

fn default_interaction_type() -> String {
    "DISCUSSION".to_string()
}

fn default_microphone_distance() -> String {
    "NEARFIELD".to_string()
}

fn default_recording_device_type() -> String {
    "PC".to_string()
}

fn default_transcoder_program() -> String {
    "ffmpeg".to_string()
}

fn default_transcoder_args() -> Vec<String> {
    [
        "-y",
        "-loglevel",
        "error",
        "-i",
        "{input}",
        "-ac",
        "{channels}",
        "-ar",
        "{sample_rate}",
        "-c:a",
        "flac",
        "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_poll_interval_ms() -> u64 {
    2000
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if AudioEncoding::parse(&self.recognition.encoding).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unsupported recognition.encoding '{}'",
                self.recognition.encoding
            )));
        }
        if self.storage.bucket.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.bucket must not be empty".to_string(),
            ));
        }
        if self.transcoder.channels == 0 || self.transcoder.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "transcoder.channels and transcoder.sample_rate must be positive".to_string(),
            ));
        }
        if self.operation.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "operation.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the request for one run. `audio` carries the rate and channel
    /// count the transcoder actually produced; without it the configured
    /// declaration (if any) is used.
    pub fn recognition_request(
        &self,
        audio: Option<(AudioEncoding, u32, u16)>,
    ) -> RecognitionRequest {
        let rc = &self.recognition;
        let (encoding, sample_rate_hertz, audio_channel_count) = match audio {
            Some((encoding, rate, channels)) => (encoding, Some(rate), Some(channels)),
            None => (
                AudioEncoding::parse(&rc.encoding).unwrap_or(AudioEncoding::Flac),
                rc.sample_rate_hertz,
                None,
            ),
        };

        RecognitionRequest {
            encoding,
            sample_rate_hertz,
            audio_channel_count,
            language_code: rc.language_code.clone(),
            metadata: RecognitionMetadata {
                interaction_type: rc.metadata.interaction_type.clone(),
                microphone_distance: rc.metadata.microphone_distance.clone(),
                recording_device_type: rc.metadata.recording_device_type.clone(),
            },
            enable_automatic_punctuation: rc.enable_automatic_punctuation,
            enable_word_time_offsets: rc.enable_word_time_offsets,
        }
    }
}
