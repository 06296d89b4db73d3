//! Test helpers: configuration, log capture and a local stand-in
//! for the wallet balances API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{Level, Log, Metadata, Record};
use reqwest::Url;
use tokio::{net::TcpListener, task::JoinHandle};

use crate::config::Config;

/// Default configuration, built directly so that no flag or
/// environment variable can influence a test.
pub fn config() -> Config {
    Config {
        listen_address: "127.0.0.1:0".to_string(),
        metrics_endpoint: "/metrics".to_string(),
        metrics_namespace: "wallet".to_string(),
        scrape_uri: Url::parse("http://localhost/api/WalletsClientBalances/0").unwrap(),
        scrape_timeout: Duration::from_secs(60),
    }
}

// ------------------------------------------------------------
// Log capture
// ------------------------------------------------------------
//
// Process-wide logger keeping every formatted record. Tests run
// in parallel, so callers filter captured lines by something
// unique to their own run (e.g. the scrape uri).
//
struct CapturingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.lines
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();

fn logger() -> &'static CapturingLogger {
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            lines: Mutex::new(Vec::new()),
        }));
        log::set_logger(logger).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
        logger
    })
}

/// Installs the capturing logger (once per test binary).
pub fn capture_logs() {
    logger();
}

/// Captured lines at `level` that contain `needle`.
pub fn logged(level: Level, needle: &str) -> Vec<String> {
    logger()
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, line)| *l == level && line.contains(needle))
        .map(|(_, line)| line.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct UpstreamReply {
    status: u16,
    body: String,
    delay: Duration,
}

impl UpstreamReply {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct UpstreamState {
    reply: Arc<Mutex<UpstreamReply>>,
    hits: Arc<AtomicUsize>,
}

/// HTTP server on an ephemeral loopback port answering every
/// request with the configured reply. Stopped on drop.
pub struct Upstream {
    addr: SocketAddr,
    state: UpstreamState,
    task: JoinHandle<()>,
}

impl Upstream {
    pub async fn start(reply: UpstreamReply) -> Self {
        let state = UpstreamState {
            reply: Arc::new(Mutex::new(reply)),
            hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new().fallback(answer).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    /// URL of a loopback port with nothing listening on it.
    pub async fn unused_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{addr}/api/WalletsClientBalances/0")).unwrap()
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api/WalletsClientBalances/0", self.addr)).unwrap()
    }

    pub fn set_reply(&self, reply: UpstreamReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(State(state): State<UpstreamState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let reply = state.reply.lock().unwrap().clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap();
    (status, reply.body).into_response()
}
