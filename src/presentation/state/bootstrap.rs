use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{
    ClassificationError, SentimentClassifier, TranscriptionEngine, TranscriptionError,
};
use crate::application::services::AnalysisService;
use crate::infrastructure::audio::TranscriptionEngineFactory;
use crate::infrastructure::sentiment::SentimentClassifierFactory;
use crate::presentation::config::Settings;

use super::ServiceStatus;

/// Loads both models once. Never panics: a failed load yields
/// [`ServiceStatus::Unavailable`] and the server keeps answering with 500s.
///
/// Loaders may block; call from a blocking context.
pub fn bootstrap<T, S>(load_transcription: T, load_classifier: S, temp_dir: PathBuf) -> ServiceStatus
where
    T: FnOnce() -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError>,
    S: FnOnce() -> Result<Arc<dyn SentimentClassifier>, ClassificationError>,
{
    tracing::info!("Loading transcription model...");
    let transcription_engine = match load_transcription() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Error loading transcription model");
            return ServiceStatus::unavailable(format!("transcription model: {}", e));
        }
    };
    tracing::info!("Transcription model loaded successfully");

    tracing::info!("Loading sentiment analysis model...");
    let sentiment_classifier = match load_classifier() {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!(error = %e, "Error loading sentiment model");
            return ServiceStatus::unavailable(format!("sentiment model: {}", e));
        }
    };
    tracing::info!("Sentiment analysis model loaded successfully");

    if let Err(e) = std::fs::create_dir_all(&temp_dir) {
        tracing::warn!(error = %e, path = %temp_dir.display(), "Temporary upload directory is not usable");
    }

    ServiceStatus::Ready(Arc::new(AnalysisService::new(
        transcription_engine,
        sentiment_classifier,
        temp_dir,
    )))
}

/// [`bootstrap`] wired to the providers selected in `settings`.
pub fn bootstrap_from_settings(settings: &Settings) -> ServiceStatus {
    let transcription = &settings.transcription;
    let sentiment = &settings.sentiment;

    bootstrap(
        || {
            TranscriptionEngineFactory::create(
                transcription.provider,
                &transcription.model,
                transcription.api_key.clone(),
                transcription.base_url.clone(),
            )
        },
        || SentimentClassifierFactory::create(sentiment.provider, &sentiment.model),
        settings.upload.resolved_temp_dir(),
    )
}
