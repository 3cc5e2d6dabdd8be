//! Entry point discovery: the first token(s) or params value a harvest starts from.
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde_json::Value;

use crate::cascade::FetchCascade;
use crate::host::HostEnvironment;
use crate::observe::RequestObserver;
use crate::tokens::{action_tokens, collect_permissive, item_token, TokenSink};
use crate::tree::{dig_str, is_records_target_id, walk_objects};
use crate::types::{EntryPoint, HarvestError, RequestPayload, SessionContext};

const ACTION_KEYS: [&str; 2] = ["appendContinuationItemsAction", "reloadContinuationItemsCommand"];

/// Tokens from node shapes that are known to open the records section.
pub fn entry_tokens(doc: &Value) -> Vec<String> {
    let mut sink = TokenSink::default();
    walk_objects(doc, |node, _| {
        if let Some(section) = node.get("itemSectionRenderer") {
            if is_records_section(section) {
                let contents = section
                    .get("contents")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                sink.extend(contents.iter().filter_map(item_token));
                sink.extend(collect_permissive(section).iter().map(String::as_str));
            }
        }
        if let Some(panel) = node.get("engagementPanelSectionListRenderer") {
            let records_panel = ["panelIdentifier", "targetId"]
                .iter()
                .filter_map(|key| dig_str(panel, &[*key]))
                .any(is_records_target_id);
            if records_panel {
                sink.extend(collect_permissive(panel).iter().map(String::as_str));
            }
        }
        if let Some(endpoints) = node.get("onResponseReceivedEndpoints").and_then(Value::as_array) {
            for endpoint in endpoints {
                for key in ACTION_KEYS {
                    if let Some(action) = endpoint.get(key) {
                        sink.extend(action_tokens(action));
                    }
                }
            }
        }
    });
    sink.into_vec()
}

/// Opaque `params` values sitting under a records-related node or path.
pub fn entry_params(doc: &Value) -> Vec<String> {
    let mut sink = TokenSink::default();
    walk_objects(doc, |node, ctx| {
        let Some(params) = node.get("params").and_then(Value::as_str) else {
            return;
        };
        if ctx.scoped || ctx.path_mentions("comment") || ctx.path_mentions("engagement") {
            sink.push(params);
        }
    });
    sink.into_vec()
}

fn is_records_section(section: &Value) -> bool {
    let identified = ["sectionIdentifier", "targetId"]
        .iter()
        .filter_map(|key| dig_str(section, &[*key]))
        .any(is_records_target_id);
    let has_header = section
        .get("header")
        .is_some_and(|header| header.get("commentsHeaderRenderer").is_some())
        || section
            .get("contents")
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| item.get("commentsHeaderRenderer").is_some()));
    identified || has_header
}

/// Tokens first, then params; `None` when the document has neither.
pub fn from_document(doc: &Value) -> Option<EntryPoint> {
    let tokens = entry_tokens(doc);
    if !tokens.is_empty() {
        return Some(EntryPoint::tokens(tokens));
    }
    let params = entry_params(doc);
    if !params.is_empty() {
        return Some(EntryPoint::params(params));
    }
    None
}

/// Runs the discovery strategies in priority order.
pub struct EntryDiscovery<'a> {
    pub cascade: &'a FetchCascade,
    pub observer: Option<&'a dyn RequestObserver>,
    pub observe_window: Duration,
}

impl EntryDiscovery<'_> {
    pub async fn discover(
        &self,
        session: &SessionContext,
        host: &dyn HostEnvironment,
        seed: Option<&str>,
    ) -> Result<EntryPoint, HarvestError> {
        if let Some(entry) = host.initial_state().await.as_ref().and_then(from_document) {
            engine_info!("Entry point found in initial state ({:?})", entry.kind);
            return Ok(entry);
        }

        let content_id = match seed.filter(|s| !s.is_empty()) {
            Some(seed) => Some(seed.to_string()),
            None => host.content_id().await,
        };
        if let Some(content_id) = content_id {
            match self
                .cascade
                .fetch(session, &RequestPayload::ContentId(content_id.clone()))
                .await
            {
                Ok(response) => {
                    if let Some(entry) = from_document(&response) {
                        engine_info!("Entry point found via content id {content_id} ({:?})", entry.kind);
                        return Ok(entry);
                    }
                    engine_debug!("Content id {content_id} response had no entry point");
                }
                Err(err) => engine_warn!("Content id fetch for {content_id} failed: {err}"),
            }
        }

        if let Some(observer) = self.observer {
            if let Some(entry) = observer.observe(self.observe_window).await {
                engine_info!("Entry point observed in host traffic ({:?})", entry.kind);
                return Ok(entry);
            }
        }

        Err(HarvestError::NoEntryPoint)
    }
}
