use crate::app::AppState;
use crate::batch::write_in_chunks;
use crate::error::IngestError;
use crate::ingest::transform::{transform_metrics, transform_workouts};
use crate::ingest::types::{IngestBody, PushSummary};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::error::Category;
use subtle::ConstantTimeEq;

pub const HEALTH_OP: &str = "ingest_health_datapoints";
pub const WORKOUT_OP: &str = "ingest_workout_datapoints";

pub async fn push(State(st): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match ingest(&st, &headers, &body).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            st.metrics.push_rejected(err.reason());
            tracing::warn!(reason = err.reason(), error = %err, "push rejected");
            err.into_response()
        }
    }
}

async fn ingest(st: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<PushSummary, IngestError> {
    if st.ready.is_draining() {
        return Err(IngestError::Draining);
    }
    authorize(headers, &st.cfg.auth.api_key)?;

    let payload: IngestBody = serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Data => IngestError::malformed(e.to_string()),
        Category::Io | Category::Syntax | Category::Eof => IngestError::MalformedRequest(e),
    })?;

    let ingest = &st.cfg.ingest;
    let data = payload.data.as_ref();
    let health = transform_metrics(data, ingest.boolean_fields, ingest.absent_collections)?;
    let workouts = transform_workouts(data, ingest.absent_collections)?;

    let chunks = write_in_chunks(st.sink.as_ref(), &health, ingest.chunk_size, HEALTH_OP).await?;
    st.metrics.batch_written("health", health.len(), chunks);

    let chunks = write_in_chunks(st.sink.as_ref(), &workouts, ingest.chunk_size, WORKOUT_OP).await?;
    st.metrics.batch_written("workout", workouts.len(), chunks);

    Ok(PushSummary {
        ingested_health_datapoints: health.len(),
        ingested_workout_datapoints: workouts.len(),
    })
}

fn authorize(headers: &HeaderMap, api_key: &str) -> Result<(), IngestError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .ok_or(IngestError::Auth)?;

    if bool::from(token.as_bytes().ct_eq(api_key.as_bytes())) {
        Ok(())
    } else {
        Err(IngestError::Auth)
    }
}
