mod analysis;
mod audio_upload;
mod sentiment;
mod transcript;

pub use analysis::Analysis;
pub use audio_upload::{AudioUpload, UploadId};
pub use sentiment::{SentimentLabel, SentimentResult};
pub use transcript::Transcript;
