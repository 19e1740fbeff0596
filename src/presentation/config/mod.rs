mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    SentimentSettings, ServerSettings, Settings, TranscriptionSettings, UploadSettings,
};
