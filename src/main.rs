use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use health_receiver::app::AppState;
use health_receiver::config::ReceiverCfg;
use health_receiver::influx::InfluxSink;
use health_receiver::metrics::AppMetrics;
use health_receiver::readiness::{start_readiness_probe, Readiness};
use health_receiver::sink::PointSink;
use health_receiver::{http, logging};

#[derive(Parser, Debug)]
#[command(name = "health-receiver", version, about)]
struct Cli {
    /// Extra config file, layered over `receiver.toml`.
    #[arg(long)]
    config: Option<String>,
    /// Overrides `http.bind`.
    #[arg(long)]
    http_bind: Option<String>,
    /// Print the effective bind address and exit.
    #[arg(long)]
    print_bind: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = ReceiverCfg::load(cli.config, cli.http_bind)?;
    cfg.validate()?;

    if cli.print_bind {
        println!("{}", cfg.http.bind);
        return Ok(());
    }

    logging::init()?;
    let cfg = Arc::new(cfg);

    let sink: Arc<dyn PointSink> = Arc::new(InfluxSink::new(&cfg.db)?);
    let ready = Arc::new(Readiness::new());
    match sink.ensure_database().await {
        Ok(()) => ready
            .db_ensured
            .store(true, std::sync::atomic::Ordering::Relaxed),
        Err(e) => tracing::warn!(error = %e, db = %cfg.db.name, "database not ensured at startup"),
    }
    start_readiness_probe(cfg.health.clone(), sink.clone(), ready.clone());

    let state = AppState {
        cfg: cfg.clone(),
        ready,
        sink,
        metrics: Arc::new(AppMetrics::new()?),
    };

    let listener = TcpListener::bind(cfg.http.bind).await?;
    println!("listening on {}", listener.local_addr()?);
    tracing::info!(addr = %listener.local_addr()?, db = %cfg.db.name, "receiver started");

    http::serve(listener, state).await
}
