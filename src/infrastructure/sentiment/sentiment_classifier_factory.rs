use std::sync::Arc;

use serde::Deserialize;

use crate::application::ports::{ClassificationError, SentimentClassifier};

use super::candle_sentiment_classifier::CandleSentimentClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentProvider {
    Local,
}

pub struct SentimentClassifierFactory;

impl SentimentClassifierFactory {
    /// Builds the configured classifier. Loading a local model is blocking.
    pub fn create(
        provider: SentimentProvider,
        model: &str,
    ) -> Result<Arc<dyn SentimentClassifier>, ClassificationError> {
        match provider {
            SentimentProvider::Local => {
                tracing::info!(model = %model, "Loading local sentiment model");
                let classifier = CandleSentimentClassifier::new(model)?;
                Ok(Arc::new(classifier))
            }
        }
    }
}
