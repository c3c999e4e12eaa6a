//! Analyze endpoints
//!
//! - `POST /analyze` runs the pipeline and returns the final response
//! - `POST /analyze/stream` streams pipeline events as Server-Sent Events

use crate::models::{AnalyzeRequest, PipelineResponse};
use crate::workflow::PipelineEvent;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Event channel capacity per streamed request
const EVENT_BUFFER: usize = 32;

/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<PipelineResponse> {
    info!(request_id = %request.request_id, "POST /analyze");
    let response = state
        .orchestrator
        .run(request, CancellationToken::new())
        .await;
    Json(response)
}

fn to_sse(event: &PipelineEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// POST /analyze/stream
///
/// The stream ends after the terminal `end` or `error` event. Dropping the
/// connection cancels the run.
pub async fn analyze_stream(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(request_id = %request.request_id, "POST /analyze/stream");
    let request_id = request.request_id.clone();
    let (mut rx, cancel) = state.orchestrator.spawn_stream(request, EVENT_BUFFER);

    let stream = async_stream::stream! {
        // Client disconnect drops the stream, and with it this guard
        let _guard = cancel.drop_guard();

        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            debug!(request_id = %request_id, event = event.event_type(), "SSE: Sending event");
            if let Some(sse) = to_sse(&event) {
                yield Ok(sse);
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// Build analyze routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/stream", post(analyze_stream))
}
