use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::application::ports::{SentimentClassifier, TranscriptionEngine, TranscriptionError};
use crate::application::services::SentimentService;
use crate::domain::{Analysis, AudioUpload};
use crate::infrastructure::observability::preview_text;

const TEMP_FILE_SUFFIX: &str = ".wav";

/// Runs the transcribe-then-classify pipeline.
///
/// Uploads are staged in a uniquely named temporary file that is removed before
/// [`AnalysisService::analyze_upload`] returns, whatever the outcome.
pub struct AnalysisService {
    transcription_engine: Arc<dyn TranscriptionEngine>,
    sentiment_service: SentimentService,
    temp_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to save uploaded audio: {0}")]
    SaveFailed(#[source] std::io::Error),
    #[error("failed to transcribe audio: {0}")]
    Transcription(#[from] TranscriptionError),
}

impl AnalysisService {
    pub fn new(
        transcription_engine: Arc<dyn TranscriptionEngine>,
        sentiment_classifier: Arc<dyn SentimentClassifier>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            transcription_engine,
            sentiment_service: SentimentService::new(sentiment_classifier),
            temp_dir,
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub async fn analyze_upload(&self, upload: &AudioUpload) -> Result<Analysis, AnalysisError> {
        let temp_file = self.save_upload(upload).await?;
        let temp_path = temp_file.path().to_path_buf();

        tracing::debug!(path = %temp_path.display(), "Saved temporary audio file");

        let result = self.analyze_file(&temp_path).await;

        match temp_file.close() {
            Ok(()) => tracing::debug!(path = %temp_path.display(), "Removed temporary audio file"),
            Err(e) => tracing::warn!(
                error = %e,
                path = %temp_path.display(),
                "Failed to remove temporary audio file"
            ),
        }

        result
    }

    /// Analyzes an audio file already on local storage. The file is left untouched.
    pub async fn analyze_file(&self, audio_path: &Path) -> Result<Analysis, AnalysisError> {
        let transcript = self.transcription_engine.transcribe(audio_path).await?;

        tracing::info!(
            chars = transcript.as_str().len(),
            text = %preview_text(transcript.as_str()),
            "Audio transcribed"
        );

        let sentiment = self.sentiment_service.classify(transcript.as_str()).await;

        tracing::info!(
            label = %sentiment.label,
            score = sentiment.score,
            "Sentiment analysis completed"
        );

        Ok(Analysis::new(transcript, sentiment))
    }

    async fn save_upload(&self, upload: &AudioUpload) -> Result<NamedTempFile, AnalysisError> {
        let temp_file = tempfile::Builder::new()
            .prefix(&format!("upload-{}-", upload.id.as_uuid()))
            .suffix(TEMP_FILE_SUFFIX)
            .tempfile_in(&self.temp_dir)
            .map_err(AnalysisError::SaveFailed)?;

        // On write failure the handle drops here and the file goes with it.
        tokio::fs::write(temp_file.path(), &upload.data)
            .await
            .map_err(AnalysisError::SaveFailed)?;

        Ok(temp_file)
    }
}
