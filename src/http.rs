use std::time::Duration;
use tracing::Span;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{self, Response, StatusCode};
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use axum_prometheus::metrics_exporter_prometheus::PrometheusHandle;
use axum_prometheus::PrometheusMetricLayer;
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::ingest::handler::push;

/// Routes without the HTTP-metrics layer; `http_metrics` is appended to `/metrics` when given.
pub fn router(state: AppState, http_metrics: Option<PrometheusHandle>) -> Router {
    let body_limit = state.cfg.ingest.max_payload_bytes;

    Router::new()
        .route("/push", post(push).layer(DefaultBodyLimit::max(body_limit)))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/metrics",
            get(move |State(st): State<AppState>| {
                let http_metrics = http_metrics.clone();
                async move {
                    let mut out = http_metrics.map(|h| h.render()).unwrap_or_default();
                    out.push_str(&st.metrics.render());
                    out
                }
            }),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &http::Request<_>| {
                    tracing::info_span!(
                      "http_request",
                      method = %req.method(),
                      path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                      status = %res.status(),
                      latency_ms = %latency.as_millis(),
                      "response"
                    )
                })
                .on_failure(
                    |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                        tracing::warn!(%error, latency_ms = %latency.as_millis(), "request_failed");
                    },
                ),
        )
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let (prom_layer, prom_handle) = PrometheusMetricLayer::pair();
    let app = router(state.clone(), Some(prom_handle)).layer(prom_layer);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.ready.start_draining();
    let grace = Duration::from_millis(state.cfg.health.drain_grace_ms);
    tracing::info!(grace_ms = grace.as_millis() as u64, "draining");
    tokio::time::sleep(grace).await;
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn readyz(State(st): State<AppState>) -> impl IntoResponse {
    if st.ready.is_ready(&st.cfg.health) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
