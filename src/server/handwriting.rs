//! `POST /api/generate-handwriting`

use super::AppState;
use crate::ai::OutputPart;
use crate::error::UpstreamErrorKind;
use crate::models::{HandwritingRequest, HandwritingResponse};
use crate::{prompts, Error, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::Engine as _;

pub const TEXT_INSTEAD_OF_IMAGE: &str =
    "Model returned text instead of image. Please try again or use a different handwriting sample.";
pub const NO_IMAGE: &str = "Failed to generate handwritten image. Please try again.";
pub const GENERIC_FAILURE: &str = "An error occurred while generating the handwritten image.";

pub async fn generate_handwriting_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<HandwritingRequest>, JsonRejection>,
) -> Result<Json<HandwritingResponse>> {
    let services = state.services()?;
    let Json(request) = payload.map_err(super::invalid_body)?;

    let answer_text = request
        .answer_text()
        .ok_or_else(|| Error::Validation("Answer text is required".to_string()))?;
    let sample_base64 = request
        .handwriting_sample()
        .ok_or_else(|| Error::Validation("Handwriting sample image is required".to_string()))?;

    let sample = base64::engine::general_purpose::STANDARD
        .decode(sample_base64.trim())
        .map_err(|e| {
            Error::Validation(format!("Handwriting sample is not valid base64: {}", e))
        })?;

    let prompt = prompts::render(prompts::HANDWRITING, &[("answer", answer_text)]);

    tracing::info!(
        sample_bytes = sample.len(),
        mime_type = request.handwriting_mime_type(),
        answer_chars = answer_text.len(),
        "Generating handwriting"
    );

    let parts = services
        .handwriting
        .synthesize(&sample, request.handwriting_mime_type(), &prompt)
        .await
        .map_err(synthesis_error)?;

    let image = first_image(parts)?;
    let png = crate::image::reencode_png(image)
        .await
        .map_err(synthesis_error)?;

    Ok(Json(HandwritingResponse::png(
        base64::engine::general_purpose::STANDARD.encode(png),
    )))
}

/// Picks the first image part. A text part seen before any image means the
/// model declined to draw.
fn first_image(parts: Vec<OutputPart>) -> Result<Vec<u8>> {
    for part in parts {
        match part {
            OutputPart::Image { mime_type, data } => {
                tracing::debug!("Model returned {} image ({} bytes)", mime_type, data.len());
                return Ok(data);
            }
            OutputPart::Text(text) => {
                tracing::warn!("Model returned text instead of image: {}", text);
                return Err(Error::UnexpectedOutput(TEXT_INSTEAD_OF_IMAGE.to_string()));
            }
        }
    }
    Err(Error::GenerationFailed(NO_IMAGE.to_string()))
}

/// Quota errors keep their retry delay; anything else collapses into the
/// generic failure message after being logged.
fn synthesis_error(err: Error) -> Error {
    match err {
        Error::Upstream(e) if e.kind == UpstreamErrorKind::Quota => {
            tracing::warn!(retry_after = ?e.retry_after, "Handwriting quota exhausted: {}", e);
            Error::QuotaExceeded {
                retry_after: e.retry_after,
            }
        }
        other => {
            tracing::error!("Handwriting generation failed: {}", other);
            Error::GenerationFailed(GENERIC_FAILURE.to_string())
        }
    }
}
