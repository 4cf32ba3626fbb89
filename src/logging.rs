use tracing_subscriber::EnvFilter;

/// Install the process-wide JSON subscriber. Call once, before serving.
///
/// Records go to stderr; stdout carries only the startup address line.
/// `RUST_LOG` selects the filter; `info` when unset or unparseable.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
