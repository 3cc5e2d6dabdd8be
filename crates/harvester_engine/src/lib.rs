//! Harvester engine: session, discovery, fetch cascade, extraction and the async harvest driver.
mod cascade;
mod config;
mod discovery;
mod engine;
mod extract;
mod fetch;
mod harvest;
mod host;
mod observe;
mod persist;
mod session;
mod sink;
mod text;
mod tokens;
mod tree;
mod types;

pub use cascade::{client_context, AttemptFailure, CascadeError, FetchCascade};
pub use config::{BootPolicy, FetchSettings, HarvestConfig, DEFAULT_CASCADE};
pub use discovery::{entry_params, entry_tokens, from_document, EntryDiscovery};
pub use engine::HarvestHandle;
pub use extract::{has_payload, Extraction, Extractor, ShapeExtractor, ShapeMatcher};
pub use fetch::{ApiRequest, ReqwestTransport, Transport};
pub use harvest::Harvester;
pub use host::{content_id_from_url, HostConfig, HostEnvironment, PageSnapshot, StaticHost, WatchPageHost};
pub use observe::{entry_from_request, ChannelObserver, ObservedRequest, RequestObserver};
pub use persist::{ensure_output_dir, text_projection, AtomicFileWriter, PersistError, RecordFormat};
pub use session::{resolve, session_from_config};
pub use sink::{ChannelProgressSink, NoopSink, ProgressSink};
pub use text::{longest_text, plain_text, record_text};
pub use tokens::{collect_permissive, collect_scoped, is_token, MIN_TOKEN_LEN};
pub use types::{
    ClientProfile, CascadeStep, EndpointVariant, EngineEvent, EntryKind, EntryPoint, FailureKind,
    FetchError, HarvestError, HarvestEvent, HarvestId, HarvestResponse, RequestPayload,
    SessionContext,
};
