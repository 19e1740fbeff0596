mod sentiment_classifier;
mod transcription_engine;

pub use sentiment_classifier::{ClassificationError, SentimentClassifier};
pub use transcription_engine::{TranscriptionEngine, TranscriptionError};
