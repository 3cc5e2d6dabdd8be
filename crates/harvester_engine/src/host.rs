use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use engine_logging::{engine_debug, engine_warn};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use url::Url;

use crate::fetch::ReqwestTransport;
use crate::tree::dig_str;
use crate::types::HarvestError;

const CONFIG_MARKER: &str = "ytcfg.set(";
const INITIAL_DATA_MARKER: &str = "ytInitialData";
const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// Key/value configuration exposed by the hosting page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostConfig(Map<String, Value>);

impl HostConfig {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string value for `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Primary api key, or the secondary one when the primary is absent.
    pub fn api_key(&self) -> Option<&str> {
        self.get_str("INNERTUBE_API_KEY")
            .or_else(|| self.get_str("INNERTUBE_API_KEYV2"))
    }

    /// Later blobs override earlier keys, matching repeated `ytcfg.set` calls.
    pub fn merge(&mut self, values: Map<String, Value>) {
        self.0.extend(values);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for HostConfig {
    fn from(values: Map<String, Value>) -> Self {
        Self(values)
    }
}

/// Where session values, the initial document and the content id come from.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    async fn config(&self) -> HostConfig;
    async fn initial_state(&self) -> Option<Value>;
    async fn content_id(&self) -> Option<String>;
}

/// What a single watch page exposes once parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    pub config: HostConfig,
    pub initial_state: Option<Value>,
    pub player_response: Option<Value>,
    pub content_id: Option<String>,
}

impl PageSnapshot {
    pub fn parse(html: &str, page_url: Option<&str>) -> Self {
        let mut config = HostConfig::default();
        for blob in objects_after(html, CONFIG_MARKER) {
            if let Value::Object(values) = blob {
                config.merge(values);
            }
        }
        let initial_state = objects_after(html, INITIAL_DATA_MARKER).into_iter().next();
        let player_response = objects_after(html, PLAYER_RESPONSE_MARKER).into_iter().next();

        let content_id = page_url
            .and_then(content_id_from_url)
            .or_else(|| {
                player_response
                    .as_ref()
                    .and_then(|p| dig_str(p, &["videoDetails", "videoId"]))
                    .map(str::to_string)
            })
            .or_else(|| {
                initial_state
                    .as_ref()
                    .and_then(|s| dig_str(s, &["currentVideoEndpoint", "watchEndpoint", "videoId"]))
                    .map(str::to_string)
            });

        Self {
            config,
            initial_state,
            player_response,
            content_id,
        }
    }
}

/// Every JSON object that directly follows an occurrence of `marker`.
fn objects_after(html: &str, marker: &str) -> Vec<Value> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = html[cursor..].find(marker) {
        let start = cursor + offset + marker.len();
        cursor = start;
        let rest = html[start..].trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '=' | '"' | '\'' | ']')
        });
        if !rest.starts_with('{') {
            continue;
        }
        match serde_json::Deserializer::from_str(rest)
            .into_iter::<Value>()
            .next()
        {
            Some(Ok(value)) => found.push(value),
            Some(Err(err)) => engine_debug!("Skipping unparsable {marker} blob: {err}"),
            None => {}
        }
    }
    found
}

/// `v` query parameter, or the id segment of a `/shorts/<id>` path.
pub fn content_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "shorts" {
            return segments.next().filter(|id| !id.is_empty()).map(str::to_string);
        }
    }
    None
}

/// In-memory host. `ready_after(n)` hides the config for the first `n` reads.
#[derive(Debug, Default)]
pub struct StaticHost {
    config: HostConfig,
    initial_state: Option<Value>,
    content_id: Option<String>,
    ready_after: usize,
    reads: AtomicUsize,
}

impl StaticHost {
    pub fn new(config: Map<String, Value>) -> Self {
        Self {
            config: HostConfig::new(config),
            ..Self::default()
        }
    }

    pub fn with_initial_state(mut self, state: Value) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    pub fn ready_after(mut self, reads: usize) -> Self {
        self.ready_after = reads;
        self
    }

    pub fn config_reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl From<PageSnapshot> for StaticHost {
    fn from(snapshot: PageSnapshot) -> Self {
        Self {
            config: snapshot.config,
            initial_state: snapshot.initial_state,
            content_id: snapshot.content_id,
            ..Self::default()
        }
    }
}

#[async_trait]
impl HostEnvironment for StaticHost {
    async fn config(&self) -> HostConfig {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if read < self.ready_after {
            HostConfig::default()
        } else {
            self.config.clone()
        }
    }

    async fn initial_state(&self) -> Option<Value> {
        self.initial_state.clone()
    }

    async fn content_id(&self) -> Option<String> {
        self.content_id.clone()
    }
}

/// Host backed by a live watch page, fetched lazily and refetched while it lacks an api key.
pub struct WatchPageHost {
    transport: Arc<ReqwestTransport>,
    url: String,
    snapshot: Mutex<Option<PageSnapshot>>,
}

impl WatchPageHost {
    pub fn new(transport: Arc<ReqwestTransport>, url: impl Into<String>) -> Result<Self, HarvestError> {
        let url = url.into();
        Url::parse(&url).map_err(|err| HarvestError::Host(format!("invalid page url {url}: {err}")))?;
        Ok(Self {
            transport,
            url,
            snapshot: Mutex::new(None),
        })
    }

    async fn snapshot(&self) -> PageSnapshot {
        let mut guard = self.snapshot.lock().await;
        let stale = guard
            .as_ref()
            .map_or(true, |s| s.config.api_key().is_none());
        if stale {
            match self.transport.get_text(&self.url).await {
                Ok(html) => *guard = Some(PageSnapshot::parse(&html, Some(&self.url))),
                Err(err) => engine_warn!("Failed to load page {}: {err}", self.url),
            }
        }
        guard.clone().unwrap_or_default()
    }
}

#[async_trait]
impl HostEnvironment for WatchPageHost {
    async fn config(&self) -> HostConfig {
        self.snapshot().await.config
    }

    async fn initial_state(&self) -> Option<Value> {
        self.snapshot().await.initial_state
    }

    async fn content_id(&self) -> Option<String> {
        content_id_from_url(&self.url).or(self.snapshot().await.content_id)
    }
}
