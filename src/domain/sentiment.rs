use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Error,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Error => "ERROR",
        }
    }

    /// Maps a classifier's own label name onto the fixed vocabulary.
    ///
    /// `ERROR` is never produced here; it is reserved for classification failures.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" | "pos" => Some(Self::Positive),
            "negative" | "neg" => Some(Self::Negative),
            "neutral" | "neu" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f32,
}

impl SentimentResult {
    /// Score is clamped to `[0, 1]`; NaN collapses to `0.0`.
    pub fn new(label: SentimentLabel, score: f32) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self { label, score }
    }

    /// Result for empty input.
    pub fn neutral() -> Self {
        Self::new(SentimentLabel::Neutral, 0.0)
    }

    /// Result for a failed classification.
    pub fn error() -> Self {
        Self::new(SentimentLabel::Error, 0.0)
    }

    pub fn is_error(&self) -> bool {
        self.label == SentimentLabel::Error
    }
}
