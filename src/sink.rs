use axum::async_trait;

use crate::domain::Point;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unparseable timestamp `{0}`")]
    Timestamp(String),
}

/// Destination for time-series points.
///
/// One instance is shared by every request, so implementations must tolerate
/// concurrent `write_points` calls.
#[async_trait]
pub trait PointSink: Send + Sync {
    async fn write_points(&self, points: &[Point]) -> Result<(), SinkError>;

    async fn ping(&self) -> Result<(), SinkError>;

    async fn ensure_database(&self) -> Result<(), SinkError>;
}
