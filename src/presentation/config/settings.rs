use std::path::PathBuf;

use config::{Config, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use crate::infrastructure::audio::TranscriptionProvider;
use crate::infrastructure::observability::LogFormat;
use crate::infrastructure::sentiment::SentimentProvider;

use super::Environment;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 5000;
const DEFAULT_WHISPER_MODEL: &str = "openai/whisper-base";
const DEFAULT_SENTIMENT_MODEL: &str = "clapAI/modernBERT-base-multilingual-sentiment";
const DEFAULT_MAX_FILE_SIZE_MB: i64 = 25;
const DEFAULT_LOG_FILTER: &str = "info,call_sentiment=debug,tower_http=debug";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub transcription: TranscriptionSettings,
    pub sentiment: SentimentSettings,
    pub upload: UploadSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentSettings {
    pub provider: SentimentProvider,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub max_file_size_mb: usize,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// Subscriber setup; `RUST_LOG` still overrides `filter` at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub filter: String,
}

impl Settings {
    /// Layers built-in defaults, `appsettings.{environment}` and `APP_*` variables.
    ///
    /// Nested keys use a double underscore: `APP_SERVER__PORT=8080`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", DEFAULT_PORT)?
            .set_default("transcription.provider", "local")?
            .set_default("transcription.model", DEFAULT_WHISPER_MODEL)?
            .set_default("sentiment.provider", "local")?
            .set_default("sentiment.model", DEFAULT_SENTIMENT_MODEL)?
            .set_default("upload.max_file_size_mb", DEFAULT_MAX_FILE_SIZE_MB)?
            .set_default("logging.format", "text")?
            .set_default("logging.filter", DEFAULT_LOG_FILTER)?
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl UploadSettings {
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
