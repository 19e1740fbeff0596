#![allow(dead_code)]

mod mock_providers;
mod multipart;
mod wav;

pub use mock_providers::{MockSentimentClassifier, MockTranscriptionEngine, PanickingTranscriptionEngine};
pub use multipart::{BOUNDARY, FormPart, multipart_body, multipart_content_type};
pub use wav::{build_stereo_wav, build_wav};

pub fn dir_entry_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
