use std::fmt;

use harvester_core::{Record, StepReport, StopReason};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type HarvestId = u64;

/// Credentials and client context needed to sign requests. Read-only once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub api_key: String,
    pub client_version: String,
    pub visitor_id: Option<String>,
    /// Forwarded verbatim as `context` in every request body, with client identity substituted.
    pub request_context: Value,
}

/// Named client identity the cascade can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClientProfile {
    Web,
    Android,
}

impl ClientProfile {
    pub fn name(&self) -> &'static str {
        match self {
            ClientProfile::Web => "WEB",
            ClientProfile::Android => "ANDROID",
        }
    }

    /// Numeric id sent in the `X-YouTube-Client-Name` header.
    pub fn header_id(&self) -> &'static str {
        match self {
            ClientProfile::Web => "1",
            ClientProfile::Android => "3",
        }
    }

    /// Fixed version for identities that do not use the session's own version.
    pub fn version_hint(&self) -> Option<&'static str> {
        match self {
            ClientProfile::Web => None,
            ClientProfile::Android => Some("19.39.34"),
        }
    }

    pub fn client_version(&self, session: &SessionContext) -> String {
        self.version_hint()
            .map(str::to_string)
            .unwrap_or_else(|| session.client_version.clone())
    }
}

/// Remote operation a cascade attempt targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointVariant {
    Next,
    Browse,
}

impl EndpointVariant {
    pub fn path(&self) -> &'static str {
        match self {
            EndpointVariant::Next => "/youtubei/v1/next",
            EndpointVariant::Browse => "/youtubei/v1/browse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeStep {
    pub profile: ClientProfile,
    pub endpoint: EndpointVariant,
}

impl CascadeStep {
    pub const fn new(profile: ClientProfile, endpoint: EndpointVariant) -> Self {
        Self { profile, endpoint }
    }
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.profile.name(), self.endpoint.path())
    }
}

/// What one logical request asks for; each variant maps to one body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    Continuation(String),
    Params(String),
    ContentId(String),
}

impl RequestPayload {
    pub fn field(&self) -> (&'static str, &str) {
        match self {
            RequestPayload::Continuation(token) => ("continuation", token),
            RequestPayload::Params(params) => ("params", params),
            RequestPayload::ContentId(id) => ("videoId", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Tokens,
    Params,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub kind: EntryKind,
    pub values: Vec<String>,
}

impl EntryPoint {
    pub fn tokens(values: Vec<String>) -> Self {
        Self {
            kind: EntryKind::Tokens,
            values,
        }
    }

    pub fn params(values: Vec<String>) -> Self {
        Self {
            kind: EntryKind::Params,
            values,
        }
    }
}

/// Best-effort progress notifications for one harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    Started { seed: Option<String> },
    EntryPoint { kind: EntryKind, count: usize },
    Seeded { frontier: usize, records: usize },
    Step(StepReport),
    Advisory { message: String },
    Finished { records: usize, reason: StopReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress {
        harvest_id: HarvestId,
        event: HarvestEvent,
    },
    Completed {
        harvest_id: HarvestId,
        response: HarvestResponse,
    },
}

/// Outward result of one harvest: either a consistent record list or a single error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HarvestResponse {
    pub fn success(records: Vec<Record>) -> Self {
        Self {
            ok: true,
            records: Some(records),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            records: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<Vec<Record>, HarvestError>> for HarvestResponse {
    fn from(result: Result<Vec<Record>, HarvestError>) -> Self {
        match result {
            Ok(records) => Self::success(records),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

/// Fatal errors; everything per-token is absorbed by the traversal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarvestError {
    #[error("session context not ready after {attempts} attempts")]
    BootNotReady { attempts: u32 },
    #[error("no entry point found")]
    NoEntryPoint,
    #[error("harvest cancelled")]
    Cancelled,
    #[error("host unavailable: {0}")]
    Host(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
