//! `POST /api/analyze`

use super::AppState;
use crate::ai::InlineDocument;
use crate::models::{AnalysisRequest, RelayMode};
use crate::relay::{self, FrameStream};
use crate::{Error, Result};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

const MISSING_FILE: &str = "File data is required";

pub async fn analyze_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Response> {
    let services = state.services()?;
    let Json(request) = payload.map_err(super::invalid_body)?;

    let data = request
        .binary_data()
        .ok_or_else(|| Error::Validation(MISSING_FILE.to_string()))?;
    let mime_type = request
        .mime_type()
        .ok_or_else(|| Error::Validation(MISSING_FILE.to_string()))?;

    let document = InlineDocument {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    };
    let model = request.model_or(&state.analyze_model);

    tracing::info!(
        mode = ?state.relay_mode,
        model,
        mime_type,
        "Analyzing document"
    );

    let frames = match state.relay_mode {
        RelayMode::Buffered => {
            let text = services.analysis.analyze(&document, model).await?;
            tracing::debug!("Analysis produced {} chars", text.len());
            relay::buffered_stream(text)
        }
        RelayMode::Passthrough => {
            let upstream = services.analysis.analyze_stream(&document, model).await?;
            relay::relay_stream(upstream)
        }
    };

    Ok(event_stream(frames))
}

fn event_stream(frames: FrameStream) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}
