pub mod app;
pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod influx;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod readiness;
pub mod sink;
