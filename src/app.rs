use std::sync::Arc;

use crate::config::ReceiverCfg;
use crate::metrics::AppMetrics;
use crate::readiness::Readiness;
use crate::sink::PointSink;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ReceiverCfg>,
    pub ready: Arc<Readiness>,
    pub sink: Arc<dyn PointSink>,
    pub metrics: Arc<AppMetrics>,
}
