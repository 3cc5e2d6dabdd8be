use std::time::Duration;

use async_trait::async_trait;
use engine_logging::engine_debug;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout_at, Instant};

use crate::tokens::is_token;
use crate::types::EntryPoint;

/// Only requests against this endpoint family are considered.
pub const OBSERVED_PREFIX: &str = "/youtubei/v1/";

/// An outgoing request issued by the host, as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRequest {
    pub url: String,
    pub body: Option<String>,
}

impl ObservedRequest {
    pub fn new(url: impl Into<String>, body: Option<String>) -> Self {
        Self {
            url: url.into(),
            body,
        }
    }
}

/// Last-resort discovery: watch the host's own traffic for a bounded window.
#[async_trait]
pub trait RequestObserver: Send + Sync {
    async fn observe(&self, window: Duration) -> Option<EntryPoint>;
}

/// Observer fed by whoever can see the host's requests.
pub struct ChannelObserver {
    rx: Mutex<mpsc::Receiver<ObservedRequest>>,
}

impl ChannelObserver {
    pub fn channel(capacity: usize) -> (mpsc::Sender<ObservedRequest>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl RequestObserver for ChannelObserver {
    async fn observe(&self, window: Duration) -> Option<EntryPoint> {
        let deadline = Instant::now() + window;
        let mut rx = self.rx.lock().await;
        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(request)) => {
                    if let Some(entry) = entry_from_request(&request) {
                        return Some(entry);
                    }
                }
                Ok(None) => return None,
                Err(_) => {
                    engine_debug!("Observation window of {window:?} elapsed");
                    return None;
                }
            }
        }
    }
}

/// Continuation wins over params when a body carries both.
pub fn entry_from_request(request: &ObservedRequest) -> Option<EntryPoint> {
    if !request.url.contains(OBSERVED_PREFIX) {
        return None;
    }
    let body: Value = serde_json::from_str(request.body.as_deref()?).ok()?;
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .filter(|value| is_token(value))
            .map(str::to_string)
    };
    if let Some(token) = field("continuation") {
        return Some(EntryPoint::tokens(vec![token]));
    }
    field("params").map(|params| EntryPoint::params(vec![params]))
}
