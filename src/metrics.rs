use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct AppMetrics {
    registry: Registry,
    points_written: IntCounterVec,
    chunks_written: IntCounterVec,
    push_rejected: IntCounterVec,
}

impl AppMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let points_written = IntCounterVec::new(
            Opts::new(
                "receiver_points_written_total",
                "Points handed to the database, by batch kind",
            ),
            &["kind"],
        )?;
        let chunks_written = IntCounterVec::new(
            Opts::new(
                "receiver_chunks_written_total",
                "Chunk writes completed, by batch kind",
            ),
            &["kind"],
        )?;
        let push_rejected = IntCounterVec::new(
            Opts::new(
                "receiver_push_rejected_total",
                "Push requests that ended in an error response",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(points_written.clone()))?;
        registry.register(Box::new(chunks_written.clone()))?;
        registry.register(Box::new(push_rejected.clone()))?;

        Ok(Self {
            registry,
            points_written,
            chunks_written,
            push_rejected,
        })
    }

    pub fn batch_written(&self, kind: &str, points: usize, chunks: usize) {
        self.points_written
            .with_label_values(&[kind])
            .inc_by(points as u64);
        self.chunks_written
            .with_label_values(&[kind])
            .inc_by(chunks as u64);
    }

    pub fn push_rejected(&self, reason: &str) {
        self.push_rejected.with_label_values(&[reason]).inc();
    }

    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
