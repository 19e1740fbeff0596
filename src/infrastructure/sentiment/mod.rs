mod candle_sentiment_classifier;
mod sentiment_classifier_factory;

pub use candle_sentiment_classifier::CandleSentimentClassifier;
pub use sentiment_classifier_factory::{SentimentClassifierFactory, SentimentProvider};
