use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{D, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_nn::ops::softmax;
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config, ModernBertForSequenceClassification,
};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::application::ports::{ClassificationError, SentimentClassifier};
use crate::domain::{SentimentLabel, SentimentResult};

/// Local ModernBERT sequence classifier on candle.
pub struct CandleSentimentClassifier {
    runtime: Arc<ClassifierRuntime>,
}

struct ClassifierRuntime {
    model: ModernBertForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    labels: Vec<SentimentLabel>,
}

/// The parts of a Hugging Face `config.json` that candle's `Config` does not
/// read reliably: HF writes `label2id` values as integers, which makes the
/// flattened `ClassifierConfig` fail to parse and silently drop the pooling mode.
#[derive(Deserialize)]
struct LabelConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    classifier_pooling: Option<ClassifierPooling>,
}

impl CandleSentimentClassifier {
    /// Downloads (or reuses the cached) model and loads it. Blocking.
    pub fn new(model_id: &str) -> Result<Self, ClassificationError> {
        let device = Device::Cpu;

        tracing::info!(
            device = ?device,
            model = model_id,
            "Initializing Candle sentiment classifier"
        );

        let api = Api::new().map_err(|e| ClassificationError::ModelLoadFailed(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("config.json: {}", e)))?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
            ClassificationError::ModelLoadFailed(format!("tokenizer.json: {}", e))
        })?;
        let weights_path = repo.get("model.safetensors").map_err(|e| {
            ClassificationError::ModelLoadFailed(format!("model.safetensors: {}", e))
        })?;

        let config_contents = std::fs::read_to_string(&config_path)
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("read config: {}", e)))?;
        let mut config: Config = serde_json::from_str(&config_contents)
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("parse config: {}", e)))?;
        let label_config: LabelConfigJson = serde_json::from_str(&config_contents)
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("parse labels: {}", e)))?;

        let labels = ordered_labels(&label_config.id2label)?;
        let pooling = resolve_pooling(&label_config, &config);
        tracing::debug!(pooling = ?pooling, "Sequence classifier pooling");
        attach_classifier_config(&mut config, label_config.id2label, pooling);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| {
                ClassificationError::ModelLoadFailed(format!("truncation config: {}", e))
            })?;

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| ClassificationError::ModelLoadFailed(format!("weights: {}", e)))?
        };

        let model = ModernBertForSequenceClassification::load(vb, &config)
            .map_err(|e| ClassificationError::ModelLoadFailed(format!("model: {}", e)))?;

        tracing::info!(
            model = model_id,
            labels = labels.len(),
            "Candle sentiment classifier loaded successfully"
        );

        Ok(Self {
            runtime: Arc::new(ClassifierRuntime {
                model,
                tokenizer,
                device,
                labels,
            }),
        })
    }
}

#[async_trait]
impl SentimentClassifier for CandleSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<SentimentResult>, ClassificationError> {
        let runtime = Arc::clone(&self.runtime);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || runtime.score(&text))
            .await
            .map_err(|e| ClassificationError::InferenceFailed(format!("worker: {}", e)))?
    }
}

impl ClassifierRuntime {
    fn score(&self, text: &str) -> Result<Vec<SentimentResult>, ClassificationError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassificationError::TokenizationFailed(e.to_string()))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| ClassificationError::InferenceFailed(e.to_string()))?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| ClassificationError::InferenceFailed(e.to_string()))?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask)
            .map_err(|e| ClassificationError::InferenceFailed(format!("forward: {}", e)))?;

        let probabilities: Vec<f32> = softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1())
            .map_err(|e| ClassificationError::InferenceFailed(format!("softmax: {}", e)))?;

        if probabilities.len() != self.labels.len() {
            return Err(ClassificationError::InferenceFailed(format!(
                "model produced {} scores for {} labels",
                probabilities.len(),
                self.labels.len()
            )));
        }

        Ok(self
            .labels
            .iter()
            .zip(probabilities)
            .map(|(label, score)| SentimentResult::new(*label, score))
            .collect())
    }
}

/// Orders `id2label` by class index and maps each name onto the fixed vocabulary.
fn ordered_labels(
    id2label: &HashMap<String, String>,
) -> Result<Vec<SentimentLabel>, ClassificationError> {
    if id2label.is_empty() {
        return Err(ClassificationError::ModelLoadFailed(
            "config.json has no id2label mapping".to_string(),
        ));
    }

    let mut indexed = Vec::with_capacity(id2label.len());
    for (id, name) in id2label {
        let index: usize = id.parse().map_err(|_| {
            ClassificationError::ModelLoadFailed(format!("invalid label id: {}", id))
        })?;
        let label = SentimentLabel::from_model_label(name)
            .ok_or_else(|| ClassificationError::UnknownLabel(name.clone()))?;
        indexed.push((index, label));
    }
    indexed.sort_by_key(|(index, _)| *index);

    let contiguous = indexed.iter().enumerate().all(|(i, (index, _))| i == *index);
    if !contiguous {
        return Err(ClassificationError::ModelLoadFailed(
            "id2label ids are not contiguous from 0".to_string(),
        ));
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

/// Pooling declared in `config.json` wins; candle's default (CLS, as in HF) otherwise.
fn resolve_pooling(label_config: &LabelConfigJson, config: &Config) -> ClassifierPooling {
    label_config
        .classifier_pooling
        .or_else(|| config.classifier_config.as_ref().map(|c| c.classifier_pooling))
        .unwrap_or_default()
}

fn attach_classifier_config(
    config: &mut Config,
    id2label: HashMap<String, String>,
    pooling: ClassifierPooling,
) {
    let label2id = id2label
        .iter()
        .map(|(id, label)| (label.clone(), id.clone()))
        .collect();

    config.classifier_config = Some(ClassifierConfig {
        id2label,
        label2id,
        classifier_pooling: pooling,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id2label(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn given_three_class_mapping_when_ordering_then_follows_class_index() {
        let mapping = id2label(&[("2", "positive"), ("0", "negative"), ("1", "neutral")]);

        let labels = ordered_labels(&mapping).unwrap();

        assert_eq!(
            labels,
            vec![
                SentimentLabel::Negative,
                SentimentLabel::Neutral,
                SentimentLabel::Positive
            ]
        );
    }

    #[test]
    fn given_generic_label_names_when_ordering_then_rejects_unknown_label() {
        let mapping = id2label(&[("0", "LABEL_0"), ("1", "LABEL_1")]);

        let result = ordered_labels(&mapping);

        assert!(matches!(result, Err(ClassificationError::UnknownLabel(_))));
    }

    #[test]
    fn given_gap_in_ids_when_ordering_then_fails_model_load() {
        let mapping = id2label(&[("0", "negative"), ("2", "positive")]);

        let result = ordered_labels(&mapping);

        assert!(matches!(result, Err(ClassificationError::ModelLoadFailed(_))));
    }

    const HF_CONFIG_CLS: &str = r#"{
        "architectures": ["ModernBertForSequenceClassification"],
        "vocab_size": 50368,
        "hidden_size": 768,
        "num_hidden_layers": 22,
        "num_attention_heads": 12,
        "intermediate_size": 1152,
        "max_position_embeddings": 8192,
        "layer_norm_eps": 1e-05,
        "pad_token_id": 50283,
        "global_attn_every_n_layers": 3,
        "global_rope_theta": 160000.0,
        "local_attention": 128,
        "local_rope_theta": 10000.0,
        "classifier_pooling": "cls",
        "id2label": {"0": "negative", "1": "neutral", "2": "positive"},
        "label2id": {"negative": 0, "neutral": 1, "positive": 2}
    }"#;

    #[test]
    fn given_hf_config_with_cls_pooling_when_parsing_labels_then_keeps_declared_pooling() {
        let label_config: LabelConfigJson = serde_json::from_str(HF_CONFIG_CLS).unwrap();

        assert!(matches!(
            label_config.classifier_pooling,
            Some(ClassifierPooling::CLS)
        ));
        assert_eq!(ordered_labels(&label_config.id2label).unwrap().len(), 3);
    }

    #[test]
    fn given_hf_config_with_mean_pooling_when_parsing_labels_then_keeps_declared_pooling() {
        let json = HF_CONFIG_CLS.replace(r#""cls""#, r#""mean""#);

        let label_config: LabelConfigJson = serde_json::from_str(&json).unwrap();

        assert!(matches!(
            label_config.classifier_pooling,
            Some(ClassifierPooling::MEAN)
        ));
    }

    #[test]
    fn given_integer_label2id_when_resolving_pooling_then_uses_declared_mode() {
        let mean_json = HF_CONFIG_CLS.replace(r#""cls""#, r#""mean""#);

        for (json, expect_mean) in [(HF_CONFIG_CLS.to_string(), false), (mean_json, true)] {
            let config: Config = serde_json::from_str(&json).unwrap();
            let label_config: LabelConfigJson = serde_json::from_str(&json).unwrap();

            let pooling = resolve_pooling(&label_config, &config);

            assert_eq!(matches!(pooling, ClassifierPooling::MEAN), expect_mean);
        }
    }

    #[test]
    fn given_config_without_pooling_when_parsing_labels_then_leaves_it_unset() {
        let label_config: LabelConfigJson =
            serde_json::from_str(r#"{"id2label": {"0": "negative", "1": "positive"}}"#).unwrap();

        assert!(label_config.classifier_pooling.is_none());
    }

    #[test]
    fn given_empty_mapping_when_ordering_then_fails_model_load() {
        let result = ordered_labels(&HashMap::new());

        assert!(matches!(result, Err(ClassificationError::ModelLoadFailed(_))));
    }
}
