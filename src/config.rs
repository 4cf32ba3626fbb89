use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Maximum number of points handed to the database in one write.
pub const DATAPOINTS_CHUNK: usize = 80_000;

// Flat variable names operators already deploy with, mapped onto nested keys.
const FLAT_ENV_KEYS: [(&str, &str); 4] = [
    ("HR_DB_HOST", "db.host"),
    ("HR_DB_PORT", "db.port"),
    ("HR_DB_NAME", "db.name"),
    ("HR_API_KEY", "auth.api_key"),
];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReceiverCfg {
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub db: DbCfg,
    #[serde(default)]
    pub auth: AuthCfg,
    #[serde(default)]
    pub ingest: IngestCfg,
    #[serde(default)]
    pub health: HealthCfg,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct HttpCfg {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}
impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct DbCfg {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}
impl Default for DbCfg {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8086,
            name: "health".into(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

impl DbCfg {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct AuthCfg {
    pub api_key: String,
}
impl Default for AuthCfg {
    fn default() -> Self {
        Self {
            api_key: "api_key_receiver".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct IngestCfg {
    pub chunk_size: usize,
    pub max_payload_bytes: usize,
    pub boolean_fields: BooleanFields,
    pub absent_collections: AbsentCollections,
}
impl Default for IngestCfg {
    fn default() -> Self {
        Self {
            chunk_size: DATAPOINTS_CHUNK,
            max_payload_bytes: 256 * 1024 * 1024,
            boolean_fields: BooleanFields::default(),
            absent_collections: AbsentCollections::default(),
        }
    }
}

/// How boolean datapoint values are stored.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BooleanFields {
    /// `"true"` / `"false"` tag values.
    #[default]
    Tag,
    /// `1.0` / `0.0` field values.
    Numeric,
}

/// What an absent `data`, `metrics`, `workouts`, series `data` or `route` key means.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AbsentCollections {
    #[default]
    Empty,
    Reject,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCfg {
    pub require_sink: bool,
    pub probe_interval_ms: u64,
    /// How long `/readyz` reports draining before the listener closes.
    pub drain_grace_ms: u64,
}
impl Default for HealthCfg {
    fn default() -> Self {
        Self {
            require_sink: true,
            probe_interval_ms: 5000,
            drain_grace_ms: 2000,
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

impl ReceiverCfg {
    pub fn load(path: Option<String>, http_bind: Option<String>) -> anyhow::Result<Self> {
        Self::from_builder(build_config(path, http_bind, |key| std::env::var(key).ok())?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.db.host.is_empty(), "db.host cannot be empty");
        anyhow::ensure!(!self.db.name.is_empty(), "db.name cannot be empty");
        anyhow::ensure!(!self.auth.api_key.is_empty(), "auth.api_key cannot be empty");
        anyhow::ensure!(self.ingest.chunk_size > 0, "ingest.chunk_size must be positive");
        Ok(())
    }

    fn from_builder(cfg: config::Config) -> anyhow::Result<Self> {
        Ok(cfg.try_deserialize()?)
    }
}

fn build_config(
    path: Option<String>,
    http_bind: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<config::Config> {
    use config::{Config, Environment, File};
    let mut builder = Config::builder().add_source(File::with_name("receiver").required(false));
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(&path));
    }
    builder = builder.add_source(Environment::with_prefix("HR").separator("__"));
    for (var, key) in FLAT_ENV_KEYS {
        builder = builder.set_override_option(key, lookup(var))?;
    }
    builder = builder.set_override_option("http.bind", http_bind)?;
    Ok(builder.build()?)
}
