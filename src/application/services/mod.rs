mod analysis_service;
mod sentiment_service;

pub use analysis_service::{AnalysisError, AnalysisService};
pub use sentiment_service::SentimentService;
