use std::path::PathBuf;

use call_sentiment::infrastructure::audio::TranscriptionProvider;
use call_sentiment::infrastructure::observability::LogFormat;
use call_sentiment::infrastructure::sentiment::SentimentProvider;
use call_sentiment::presentation::{Environment, Settings};

#[test]
fn given_no_overrides_when_loading_test_settings_then_uses_defaults() {
    let settings = Settings::load(Environment::Test).unwrap();

    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.transcription.provider, TranscriptionProvider::Local);
    assert_eq!(settings.transcription.model, "openai/whisper-base");
    assert_eq!(settings.sentiment.provider, SentimentProvider::Local);
    assert_eq!(
        settings.sentiment.model,
        "clapAI/modernBERT-base-multilingual-sentiment"
    );
    assert_eq!(settings.upload.max_file_size_mb, 25);
    assert_eq!(settings.upload.max_file_size_bytes(), 25 * 1024 * 1024);
}

#[test]
fn given_no_overrides_when_loading_test_settings_then_logs_as_text_with_default_filter() {
    let settings = Settings::load(Environment::Test).unwrap();

    assert_eq!(settings.logging.format, LogFormat::Text);
    assert_eq!(
        settings.logging.filter,
        "info,call_sentiment=debug,tower_http=debug"
    );
}

#[test]
fn given_lowercase_format_names_when_deserializing_then_maps_to_log_format() {
    assert_eq!(
        serde_json::from_str::<LogFormat>("\"json\"").unwrap(),
        LogFormat::Json
    );
    assert_eq!(
        serde_json::from_str::<LogFormat>("\"text\"").unwrap(),
        LogFormat::Text
    );
    assert!(serde_json::from_str::<LogFormat>("\"yaml\"").is_err());
}

#[test]
fn given_unset_temp_dir_when_resolving_then_falls_back_to_system_temp() {
    let settings = Settings::load(Environment::Test).unwrap();

    assert_eq!(settings.upload.resolved_temp_dir(), std::env::temp_dir());
}

#[test]
fn given_configured_temp_dir_when_resolving_then_uses_it() {
    let mut settings = Settings::load(Environment::Test).unwrap();
    settings.upload.temp_dir = Some(PathBuf::from("/var/tmp/call-sentiment"));

    assert_eq!(
        settings.upload.resolved_temp_dir(),
        PathBuf::from("/var/tmp/call-sentiment")
    );
}

#[test]
fn given_environment_names_when_parsing_then_accepts_known_values_case_insensitively() {
    assert_eq!(
        Environment::try_from("LOCAL".to_string()),
        Ok(Environment::Local)
    );
    assert_eq!(Environment::try_from("test".to_string()), Ok(Environment::Test));
    assert_eq!(
        Environment::try_from("production".to_string()),
        Ok(Environment::Prod)
    );
    assert!(Environment::try_from("staging".to_string()).is_err());
}

#[test]
fn given_environment_when_formatting_then_matches_settings_file_suffix() {
    assert_eq!(Environment::Prod.to_string(), "prod");
    assert_eq!(Environment::default(), Environment::Local);
}
