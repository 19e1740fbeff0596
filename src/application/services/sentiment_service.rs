use std::sync::Arc;

use crate::application::ports::SentimentClassifier;
use crate::domain::SentimentResult;
use crate::infrastructure::observability::preview_text;

/// Wraps a [`SentimentClassifier`] with the empty-input and failure policy.
///
/// Never fails outward: blank text yields `NEUTRAL/0.0`, any backend failure
/// yields `ERROR/0.0`.
pub struct SentimentService {
    classifier: Arc<dyn SentimentClassifier>,
}

impl SentimentService {
    pub fn new(classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn classify(&self, text: &str) -> SentimentResult {
        if text.trim().is_empty() {
            tracing::debug!("Blank transcript, skipping sentiment model");
            return SentimentResult::neutral();
        }

        let candidates = match self.classifier.classify(text).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, text = %preview_text(text), "Sentiment classification failed");
                return SentimentResult::error();
            }
        };

        match select_top_candidate(candidates) {
            Some(best) => {
                tracing::debug!(label = %best.label, score = best.score, "Sentiment classified");
                best
            }
            None => {
                tracing::warn!("Sentiment classifier returned no usable candidates");
                SentimentResult::error()
            }
        }
    }
}

fn select_top_candidate(candidates: Vec<SentimentResult>) -> Option<SentimentResult> {
    candidates
        .into_iter()
        .filter(|c| !c.is_error())
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SentimentLabel;

    #[test]
    fn given_multiple_candidates_when_selecting_then_highest_score_wins() {
        let candidates = vec![
            SentimentResult::new(SentimentLabel::Negative, 0.1),
            SentimentResult::new(SentimentLabel::Positive, 0.7),
            SentimentResult::new(SentimentLabel::Neutral, 0.2),
        ];

        let best = select_top_candidate(candidates);

        assert_eq!(
            best,
            Some(SentimentResult::new(SentimentLabel::Positive, 0.7))
        );
    }

    #[test]
    fn given_no_candidates_when_selecting_then_returns_none() {
        assert_eq!(select_top_candidate(Vec::new()), None);
    }

    #[test]
    fn given_only_error_candidates_when_selecting_then_returns_none() {
        let candidates = vec![SentimentResult::error()];

        assert_eq!(select_top_candidate(candidates), None);
    }
}
