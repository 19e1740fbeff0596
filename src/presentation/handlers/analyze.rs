use axum::{Extension, Json};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::services::AnalysisError;
use crate::domain::AudioUpload;
use crate::infrastructure::observability::RequestId;
use crate::presentation::state::{AppState, ServiceStatus};

use super::error_response::error_response;

pub const AUDIO_FIELD: &str = "audio";
const DEFAULT_FILENAME: &str = "audio.wav";

const MODELS_UNAVAILABLE: &str =
    "Analysis models failed to load on server startup. Check server logs.";
const NO_AUDIO_PART: &str = "No audio file part in the request";
const NO_SELECTED_FILE: &str = "No selected file";
const EMPTY_AUDIO: &str = "Uploaded audio file is empty";
const TRANSCRIPTION_FAILED: &str = "Failed to transcribe audio";

#[tracing::instrument(skip_all, fields(request_id = %request_id.as_str()))]
pub async fn analyze_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    tracing::info!("Received analysis request");

    let service = match &state.status {
        ServiceStatus::Ready(service) => service,
        ServiceStatus::Unavailable(reason) => {
            tracing::warn!(reason = %reason, "Rejecting request, models are not loaded");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, MODELS_UNAVAILABLE);
        }
    };

    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Request is not valid multipart");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart request: {}", rejection.body_text()),
            );
        }
    };

    let upload = match read_audio_upload(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    tracing::debug!(
        upload_id = %upload.id.as_uuid(),
        filename = %upload.filename,
        bytes = upload.size_bytes(),
        "Audio upload received"
    );

    match service.analyze_upload(&upload).await {
        Ok(analysis) => (StatusCode::OK, Json(analysis)).into_response(),
        Err(AnalysisError::SaveFailed(e)) => {
            tracing::error!(error = %e, "Failed to save uploaded audio");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save uploaded audio: {}", e),
            )
        }
        Err(AnalysisError::Transcription(e)) => {
            tracing::error!(error = %e, "Transcription failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, TRANSCRIPTION_FAILED)
        }
    }
}

/// Pulls the `audio` part out of the form, skipping any other fields.
async fn read_audio_upload(mut multipart: Multipart) -> Result<AudioUpload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => {
                tracing::warn!("Analysis request without an audio part");
                return Err(error_response(StatusCode::BAD_REQUEST, NO_AUDIO_PART));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart");
                return Err(error_response(
                    e.status(),
                    format!("Failed to read multipart: {}", e.body_text()),
                ));
            }
        };

        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        if filename.as_deref() == Some("") {
            tracing::warn!("Audio part has an empty filename");
            return Err(error_response(StatusCode::BAD_REQUEST, NO_SELECTED_FILE));
        }

        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read audio bytes");
                return Err(error_response(
                    e.status(),
                    format!("Failed to read audio file: {}", e.body_text()),
                ));
            }
        };

        if data.is_empty() {
            tracing::warn!("Audio part is empty");
            return Err(error_response(StatusCode::BAD_REQUEST, EMPTY_AUDIO));
        }

        return Ok(AudioUpload::new(
            filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            data,
        ));
    }
}
