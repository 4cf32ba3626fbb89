use crate::domain::Point;
use crate::sink::{PointSink, SinkError};

/// Write `points` to `sink` in contiguous chunks of at most `chunk_size`.
///
/// Chunks go out in order, one at a time. The first failing chunk aborts the
/// rest; chunks already written stay written. Returns the number of chunks.
pub async fn write_in_chunks(
    sink: &dyn PointSink,
    points: &[Point],
    chunk_size: usize,
    op: &'static str,
) -> Result<usize, SinkError> {
    let mut written = 0;
    for (chunk_idx, chunk) in points.chunks(chunk_size.max(1)).enumerate() {
        tracing::info!(op, chunk = chunk_idx, points = chunk.len(), "writing chunk");
        sink.write_points(chunk).await.map_err(|e| {
            tracing::warn!(op, chunk = chunk_idx, error = %e, "chunk write failed");
            e
        })?;
        written += 1;
    }
    Ok(written)
}
