mod analyze;
mod error_response;
mod health;

pub use analyze::{AUDIO_FIELD, analyze_handler};
pub use error_response::{ErrorResponse, error_response};
pub use health::{HealthResponse, health_handler};
