use async_trait::async_trait;

use crate::domain::SentimentResult;

/// Text classification capability.
///
/// Returns every label candidate the backend scored; picking the winner is the
/// caller's job.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<SentimentResult>, ClassificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("tokenization failed: {0}")]
    TokenizationFailed(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("unknown sentiment label: {0}")]
    UnknownLabel(String),
}
