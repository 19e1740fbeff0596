use serde::{Deserialize, Serialize};

use super::sentiment::SentimentResult;
use super::transcript::Transcript;

/// Combined outcome of transcribing and classifying one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub transcribed_text: Transcript,
    pub sentiment: SentimentResult,
}

impl Analysis {
    pub fn new(transcribed_text: Transcript, sentiment: SentimentResult) -> Self {
        Self {
            transcribed_text,
            sentiment,
        }
    }
}
