use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use call_sentiment::application::ports::{
    ClassificationError, SentimentClassifier, TranscriptionEngine, TranscriptionError,
};
use call_sentiment::domain::{SentimentResult, Transcript};

/// Records every path it is asked to transcribe and whether the file was there.
pub struct MockTranscriptionEngine {
    transcript: Option<String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, bool, usize)>>,
}

impl MockTranscriptionEngine {
    pub fn returning(text: &str) -> Self {
        Self {
            transcript: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _, _)| p.clone())
            .collect()
    }

    pub fn files_existed_during_calls(&self) -> bool {
        self.seen.lock().unwrap().iter().all(|(_, existed, _)| *existed)
    }

    pub fn seen_sizes(&self) -> Vec<usize> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, size)| *size)
            .collect()
    }
}

#[async_trait::async_trait]
impl TranscriptionEngine for MockTranscriptionEngine {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let size = std::fs::metadata(audio_path)
            .map(|m| m.len() as usize)
            .unwrap_or(0);
        self.seen
            .lock()
            .unwrap()
            .push((audio_path.to_path_buf(), audio_path.exists(), size));

        match &self.transcript {
            Some(text) => Ok(Transcript::from(text.as_str())),
            None => Err(TranscriptionError::DecodingFailed(
                "corrupt audio".to_string(),
            )),
        }
    }
}

pub struct PanickingTranscriptionEngine;

#[async_trait::async_trait]
impl TranscriptionEngine for PanickingTranscriptionEngine {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        assert!(audio_path.exists());
        panic!("transcription backend crashed");
    }
}

pub struct MockSentimentClassifier {
    candidates: Option<Vec<SentimentResult>>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockSentimentClassifier {
    pub fn returning(candidates: Vec<SentimentResult>) -> Self {
        Self {
            candidates: Some(candidates),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            candidates: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for MockSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<SentimentResult>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());

        match &self.candidates {
            Some(candidates) => Ok(candidates.clone()),
            None => Err(ClassificationError::InferenceFailed(
                "out of memory".to_string(),
            )),
        }
    }
}
