use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candle_core::{D, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_nn::ops::softmax;
use candle_transformers::models::whisper::{self as m, Config};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::Transcript;

use super::audio_decoder::decode_audio_file;

/// Hosts the precomputed mel filter banks; the model repos themselves do not ship them.
const MEL_FILTERS_REPO: &str = "FL33TW00D-HF/whisper-base";
const MAX_DECODE_TOKENS: usize = 224;

/// Local Whisper transcription on candle.
///
/// Weights stay resident for the life of the process. The decoder keeps a KV
/// cache, so windows are decoded one at a time on the blocking pool.
pub struct CandleWhisperEngine {
    runtime: Arc<WhisperRuntime>,
}

struct WhisperRuntime {
    model: Mutex<m::model::Whisper>,
    tokenizer: Tokenizer,
    prompt: PromptTokens,
    config: Config,
    device: Device,
    mel_filters: Vec<f32>,
}

/// Special tokens for a no-timestamp transcription prompt.
#[derive(Debug, Clone, Copy)]
struct PromptTokens {
    start_of_transcript: u32,
    transcribe: u32,
    no_timestamps: u32,
    end_of_text: u32,
    /// Absent from some fine-tuned tokenizers; the silence gate is skipped then.
    no_speech: Option<u32>,
}

impl PromptTokens {
    fn resolve(tokenizer: &Tokenizer) -> Result<Self, TranscriptionError> {
        let lookup = |token: &str| {
            tokenizer.token_to_id(token).ok_or_else(|| {
                TranscriptionError::ModelLoadFailed(format!("tokenizer lacks {}", token))
            })
        };

        Ok(Self {
            start_of_transcript: lookup(m::SOT_TOKEN)?,
            transcribe: lookup(m::TRANSCRIBE_TOKEN)?,
            no_timestamps: lookup(m::NO_TIMESTAMPS_TOKEN)?,
            end_of_text: lookup(m::EOT_TOKEN)?,
            no_speech: m::NO_SPEECH_TOKENS
                .iter()
                .find_map(|token| tokenizer.token_to_id(token)),
        })
    }

    fn initial(&self) -> Vec<u32> {
        vec![self.start_of_transcript, self.transcribe, self.no_timestamps]
    }
}

impl CandleWhisperEngine {
    /// Downloads (or reuses the cached) model and loads it. Blocking.
    pub fn new(model_id: &str) -> Result<Self, TranscriptionError> {
        let device = Device::Cpu;

        tracing::info!(
            device = ?device,
            model = model_id,
            "Initializing Candle Whisper transcription engine"
        );

        let api = Api::new().map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config: Config = serde_json::from_slice(&read_repo_file(&repo, "config.json")?)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("parse config: {}", e)))?;

        let tokenizer = Tokenizer::from_file(fetch(&repo, "tokenizer.json")?)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("tokenizer: {}", e)))?;

        let mel_repo = api.repo(Repo::new(MEL_FILTERS_REPO.to_string(), RepoType::Model));
        let mel_bytes = read_repo_file(&mel_repo, mel_filters_file(config.num_mel_bins)?)?;
        let mel_filters = parse_mel_filters(&mel_bytes, config.num_mel_bins)?;

        let weights = fetch(&repo, "model.safetensors")?;
        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights], m::DTYPE, &device)
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("weights: {}", e)))?
        };
        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("model: {}", e)))?;

        tracing::info!(
            model = model_id,
            mel_bins = config.num_mel_bins,
            "Candle Whisper engine loaded successfully"
        );

        let runtime = WhisperRuntime::new(model, tokenizer, config, device, mel_filters)?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

#[async_trait]
impl TranscriptionEngine for CandleWhisperEngine {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        let runtime = Arc::clone(&self.runtime);
        let path: PathBuf = audio_path.to_path_buf();

        tokio::task::spawn_blocking(move || runtime.transcribe_file(&path))
            .await
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("worker: {}", e)))?
    }
}

impl WhisperRuntime {
    fn new(
        model: m::model::Whisper,
        tokenizer: Tokenizer,
        config: Config,
        device: Device,
        mel_filters: Vec<f32>,
    ) -> Result<Self, TranscriptionError> {
        let prompt = PromptTokens::resolve(&tokenizer)?;
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            prompt,
            config,
            device,
            mel_filters,
        })
    }

    fn transcribe_file(&self, path: &Path) -> Result<Transcript, TranscriptionError> {
        let pcm = decode_audio_file(path)?;
        let windows = self.mel_windows(&pcm)?;

        let mut model = self.model.lock().map_err(|_| {
            TranscriptionError::TranscriptionFailed("whisper model lock poisoned".to_string())
        })?;

        let mut texts = Vec::with_capacity(windows.len());
        for (index, mel) in windows.iter().enumerate() {
            let decoded = self.greedy_decode(&mut model, mel);
            model.reset_kv_cache();
            let text = decoded?;
            tracing::debug!(window = index, chars = text.len(), "Decoded audio window");
            texts.push(text);
        }

        let transcript = Transcript::from_segments(&texts);

        tracing::info!(
            windows = windows.len(),
            chars = transcript.as_str().len(),
            "Audio transcription completed"
        );

        Ok(transcript)
    }

    /// Splits PCM into 30 s windows (last one zero-padded) as log-mel tensors of
    /// exactly `N_FRAMES` frames; `pcm_to_mel` pads its output past that.
    fn mel_windows(&self, pcm: &[f32]) -> Result<Vec<Tensor>, TranscriptionError> {
        let n_mel = self.config.num_mel_bins;
        let mut padded = vec![0.0f32; m::N_SAMPLES];

        pcm.chunks(m::N_SAMPLES)
            .map(|window| {
                padded[..window.len()].copy_from_slice(window);
                padded[window.len()..].fill(0.0);

                let mel = m::audio::pcm_to_mel(&self.config, &padded, &self.mel_filters);
                let n_frames = mel.len() / n_mel;
                Tensor::from_vec(mel, (1, n_mel, n_frames), &self.device)
                    .and_then(|t| t.narrow(2, 0, m::N_FRAMES.min(n_frames)))
                    .map_err(stage_failed("mel tensor"))
            })
            .collect()
    }

    fn greedy_decode(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
    ) -> Result<String, TranscriptionError> {
        let audio_features = model
            .encoder
            .forward(mel, true)
            .map_err(stage_failed("encoder"))?;

        let mut tokens = self.prompt.initial();
        let prompt_len = tokens.len();

        for step in 0..MAX_DECODE_TOKENS {
            let input = Tensor::new(tokens.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(stage_failed("token tensor"))?;
            let hidden = model
                .decoder
                .forward(&input, &audio_features, step == 0)
                .map_err(stage_failed("decoder"))?;

            if step == 0 && self.is_silent(model, &hidden)? {
                tracing::debug!("Window classified as no speech");
                return Ok(String::new());
            }

            let last = hidden
                .dim(1)
                .and_then(|len| hidden.i((0, len - 1..len)))
                .map_err(stage_failed("decoder output"))?;
            let next = model
                .decoder
                .final_linear(&last)
                .and_then(|logits| logits.i(0))
                .and_then(|logits| logits.argmax(0))
                .and_then(|t| t.to_scalar::<u32>())
                .map_err(stage_failed("logits"))?;

            if next == self.prompt.end_of_text {
                break;
            }
            tokens.push(next);
        }

        self.tokenizer
            .decode(&tokens[prompt_len..], true)
            .map(|text| text.trim().to_string())
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("detokenize: {}", e)))
    }

    /// Reads the no-speech probability from the logits at the start-of-transcript position.
    fn is_silent(
        &self,
        model: &m::model::Whisper,
        hidden: &Tensor,
    ) -> Result<bool, TranscriptionError> {
        let Some(no_speech) = self.prompt.no_speech else {
            return Ok(false);
        };

        let probability = hidden
            .i((0, 0..1))
            .and_then(|first| model.decoder.final_linear(&first))
            .and_then(|logits| logits.i(0))
            .and_then(|logits| token_probability(&logits, no_speech))
            .map_err(stage_failed("no-speech probability"))?;

        Ok(exceeds_no_speech_threshold(probability))
    }
}

fn token_probability(logits: &Tensor, token: u32) -> candle_core::Result<f32> {
    softmax(logits, D::Minus1)?.i(token as usize)?.to_scalar::<f32>()
}

fn exceeds_no_speech_threshold(probability: f32) -> bool {
    f64::from(probability) > m::NO_SPEECH_THRESHOLD
}

fn stage_failed(stage: &'static str) -> impl Fn(candle_core::Error) -> TranscriptionError {
    move |e| TranscriptionError::TranscriptionFailed(format!("{}: {}", stage, e))
}

fn fetch(repo: &ApiRepo, file: &str) -> Result<PathBuf, TranscriptionError> {
    repo.get(file)
        .map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", file, e)))
}

fn read_repo_file(repo: &ApiRepo, file: &str) -> Result<Vec<u8>, TranscriptionError> {
    let path = fetch(repo, file)?;
    std::fs::read(&path).map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", file, e)))
}

fn mel_filters_file(num_mel_bins: usize) -> Result<&'static str, TranscriptionError> {
    match num_mel_bins {
        80 => Ok("melfilters.bytes"),
        128 => Ok("melfilters128.bytes"),
        other => Err(TranscriptionError::ModelLoadFailed(format!(
            "unsupported number of mel bins: {}",
            other
        ))),
    }
}

/// Little-endian f32 table of `num_mel_bins * (N_FFT / 2 + 1)` weights.
fn parse_mel_filters(bytes: &[u8], num_mel_bins: usize) -> Result<Vec<f32>, TranscriptionError> {
    let expected = num_mel_bins * (m::N_FFT / 2 + 1);
    if bytes.len() < expected * 4 {
        return Err(TranscriptionError::ModelLoadFailed(format!(
            "mel filters file too small: {} bytes, expected at least {}",
            bytes.len(),
            expected * 4
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .take(expected)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
