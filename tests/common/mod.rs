#![allow(dead_code)]

//! Helpers for tests that run the `health-receiver` binary against a fake InfluxDB.

use assert_cmd::prelude::*;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// An in-process InfluxDB stand-in serving `/ping`, `/query` and `/write`.
pub struct FakeInflux {
    pub port: u16,
    writes: Arc<Mutex<Vec<(String, String)>>>,
    queries: Arc<Mutex<Vec<String>>>,
    _rt: tokio::runtime::Runtime,
}

#[derive(Clone, Default)]
struct Recorded {
    writes: Arc<Mutex<Vec<(String, String)>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeInflux {
    pub fn start() -> Self {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/ping", get(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/query",
                post(
                    |State(rec): State<Recorded>, Form(form): Form<HashMap<String, String>>| async move {
                        rec.queries
                            .lock()
                            .unwrap()
                            .push(form.get("q").cloned().unwrap_or_default());
                        r#"{"results":[{"statement_id":0}]}"#
                    },
                ),
            )
            .route(
                "/write",
                post(
                    |State(rec): State<Recorded>,
                     Query(params): Query<HashMap<String, String>>,
                     body: String| async move {
                        let db = params.get("db").cloned().unwrap_or_default();
                        rec.writes.lock().unwrap().push((db, body));
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .with_state(recorded.clone());

        let listener = rt
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        rt.spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            port,
            writes: recorded.writes,
            queries: recorded.queries,
            _rt: rt,
        }
    }

    /// `(db, line protocol body)` per `/write` call.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// A spawned receiver; killed on drop unless it already exited.
pub struct Receiver {
    pub child: Child,
    pub addr: String,
    _dir: TempDir,
}

impl Receiver {
    /// Run the binary in a temp dir holding `receiver.toml`, with `env` set.
    pub fn spawn(toml: &str, env: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("receiver.toml"), toml).unwrap();

        let mut cmd = Command::cargo_bin("health-receiver").unwrap();
        cmd.current_dir(dir.path())
            .env_remove("RUST_LOG")
            .envs(env.iter().copied())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = cmd.spawn().expect("receiver did not start");

        let stdout = child.stdout.take().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if let Some(addr) = line.strip_prefix("listening on ") {
                    let _ = tx.send(addr.trim().to_string());
                }
            }
        });

        let addr = match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(addr) => addr,
            Err(_) => {
                let _ = child.kill();
                panic!("receiver never reported its listening address");
            }
        };

        Self {
            child,
            addr,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn push(&self, token: &str, body: &str) -> u16 {
        Client::new()
            .post(self.url("/push"))
            .bearer_auth(token)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .expect("push got no response")
            .status()
            .as_u16()
    }

    pub fn status_of(&self, path: &str) -> Option<u16> {
        Client::new()
            .get(self.url(path))
            .send()
            .ok()
            .map(|r| r.status().as_u16())
    }

    /// Poll `path` until it answers `want` or `timeout` passes.
    pub fn wait_for(&self, path: &str, want: u16, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.status_of(path) == Some(want) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// One heart-rate series with two datapoints and a three-sample workout route.
pub const EXPORT: &str = r#"{"data": {
    "metrics": [{"name": "heart_rate", "data": [
        {"date": "2024-01-01T00:00:00Z", "value": 72},
        {"date": "2024-01-01 00:05:00 +0000", "value": 75, "source": "Watch"}
    ]}],
    "workouts": [{"name": "run", "start": "S", "end": "E", "route": [
        {"timestamp": "2024-01-01T07:00:00Z", "lat": 1.0, "lon": 2.0},
        {"timestamp": "2024-01-01T07:00:01Z", "lat": 1.0001, "lon": 2.0001},
        {"timestamp": "2024-01-01T07:00:02Z", "lat": 1.0002, "lon": 2.0002}
    ]}]
}}"#;
