use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HealthCfg;
use crate::sink::PointSink;

pub struct Readiness {
    pub sink_ok: AtomicBool,
    pub db_ensured: AtomicBool,
    pub draining: AtomicBool,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            sink_ok: AtomicBool::new(false),
            db_ensured: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    pub fn is_ready(&self, cfg: &HealthCfg) -> bool {
        if self.is_draining() {
            return false;
        }
        !cfg.require_sink || self.sink_ok.load(Ordering::Relaxed)
    }

    pub fn start_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Ping the sink on an interval; create the database once it is reachable.
pub fn start_readiness_probe(cfg: HealthCfg, sink: Arc<dyn PointSink>, ready: Arc<Readiness>) {
    let interval = Duration::from_millis(cfg.probe_interval_ms.max(100));

    tokio::spawn(async move {
        loop {
            let reachable = sink.ping().await.is_ok();
            if reachable && !ready.db_ensured.load(Ordering::Relaxed) {
                match sink.ensure_database().await {
                    Ok(()) => {
                        tracing::info!("database ensured");
                        ready.db_ensured.store(true, Ordering::Relaxed);
                    }
                    Err(e) => tracing::warn!(error = %e, "database creation failed"),
                }
            }

            let ok = reachable && ready.db_ensured.load(Ordering::Relaxed);
            if ready.sink_ok.swap(ok, Ordering::Relaxed) != ok {
                tracing::info!(sink_ok = ok, "sink readiness changed");
            }
            tokio::time::sleep(interval).await;
        }
    });
}
