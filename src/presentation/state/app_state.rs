use std::sync::Arc;

use crate::application::services::AnalysisService;

/// Outcome of startup model loading. Fixed for the life of the process.
#[derive(Clone)]
pub enum ServiceStatus {
    Ready(Arc<AnalysisService>),
    Unavailable(Arc<str>),
}

impl ServiceStatus {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(Arc::from(reason.into()))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn analysis_service(&self) -> Option<&Arc<AnalysisService>> {
        match self {
            Self::Ready(service) => Some(service),
            Self::Unavailable(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub status: ServiceStatus,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(status: ServiceStatus, max_upload_bytes: usize) -> Self {
        Self {
            status,
            max_upload_bytes,
        }
    }
}
