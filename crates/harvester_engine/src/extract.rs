use harvester_core::{ContinuationToken, RecordCandidate};
use serde_json::{Map, Value};

use crate::text::{plain_text, record_text};
use crate::tokens::{collect_permissive, collect_scoped, TokenSink};
use crate::tree::{dig, dig_str, walk_objects};

/// Inspects one object node and appends every record it recognises.
/// Matchers are independent and side-effect free apart from the output vector.
pub type ShapeMatcher = fn(&Map<String, Value>, &mut Vec<RecordCandidate>);

/// Keys whose presence means a response carries record data, even if nothing decoded.
const PAYLOAD_MARKERS: [&str; 5] = [
    "commentThreadRenderer",
    "commentRenderer",
    "commentViewModel",
    "commentsHeaderRenderer",
    "frameworkUpdates",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<RecordCandidate>,
    pub scoped_tokens: Vec<ContinuationToken>,
    pub permissive_tokens: Vec<ContinuationToken>,
    /// The tree contained a known record envelope.
    pub has_payload: bool,
}

impl Extraction {
    /// Union of both token passes, permissive first, without duplicates.
    pub fn tokens(&self) -> Vec<ContinuationToken> {
        let mut sink = TokenSink::default();
        sink.extend(self.permissive_tokens.iter().map(String::as_str));
        sink.extend(self.scoped_tokens.iter().map(String::as_str));
        sink.into_vec()
    }

    /// Decodable but nothing usable: no records and nowhere to go next.
    pub fn is_malformed(&self) -> bool {
        self.records.is_empty() && self.scoped_tokens.is_empty() && self.permissive_tokens.is_empty()
    }
}

pub trait Extractor: Send + Sync {
    fn extract(&self, tree: &Value) -> Extraction;
}

/// Extractor driven by an ordered list of shape matchers applied to every object node.
#[derive(Debug, Clone)]
pub struct ShapeExtractor {
    matchers: Vec<ShapeMatcher>,
}

impl Default for ShapeExtractor {
    fn default() -> Self {
        Self {
            matchers: vec![
                match_thread,
                match_comment_renderer,
                match_view_model,
                match_entity,
                match_entity_payload,
            ],
        }
    }
}

impl ShapeExtractor {
    pub fn with_matcher(mut self, matcher: ShapeMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn records(&self, tree: &Value) -> Vec<RecordCandidate> {
        let mut out = Vec::new();
        walk_objects(tree, |node, _| {
            for matcher in &self.matchers {
                matcher(node, &mut out);
            }
        });
        out
    }
}

impl Extractor for ShapeExtractor {
    fn extract(&self, tree: &Value) -> Extraction {
        Extraction {
            records: self.records(tree),
            scoped_tokens: collect_scoped(tree),
            permissive_tokens: collect_permissive(tree),
            has_payload: has_payload(tree),
        }
    }
}

pub fn has_payload(tree: &Value) -> bool {
    let mut found = false;
    walk_objects(tree, |node, _| {
        if found {
            return;
        }
        found = PAYLOAD_MARKERS.iter().any(|key| node.contains_key(*key))
            || node
                .get("payload")
                .is_some_and(|p| p.get("commentEntity").is_some() || p.get("commentEntityPayload").is_some());
    });
    found
}

/// Grouped shape: a top-level record plus its inline replies.
fn match_thread(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
    let Some(thread) = node.get("commentThreadRenderer") else {
        return;
    };
    let top = dig(thread, &["comment", "commentRenderer"])
        .and_then(Value::as_object)
        .and_then(|cr| renderer_candidate(cr, None))
        .or_else(|| {
            dig(thread, &["commentViewModel", "commentViewModel"])
                .and_then(Value::as_object)
                .and_then(|vm| view_model_candidate(vm, None))
        });
    let top_id = top.as_ref().and_then(|c| c.id.clone());
    out.extend(top);

    let replies = dig(thread, &["replies", "commentRepliesRenderer", "contents"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for reply in replies {
        if let Some(cr) = reply.get("commentRenderer").and_then(Value::as_object) {
            out.extend(renderer_candidate(cr, top_id.as_deref()));
        }
    }
}

/// Single record shape.
fn match_comment_renderer(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
    if let Some(cr) = node.get("commentRenderer").and_then(Value::as_object) {
        out.extend(renderer_candidate(cr, None));
    }
}

fn match_view_model(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
    if let Some(vm) = node.get("commentViewModel").and_then(Value::as_object) {
        out.extend(view_model_candidate(vm, None));
    }
}

/// Entity-keyed record: `payload.commentEntity`.
fn match_entity(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
    let Some(entity) = node
        .get("payload")
        .and_then(|p| p.get("commentEntity"))
        .and_then(Value::as_object)
    else {
        return;
    };
    let id = first_str(entity, &["commentId", "key", "id"]);
    let author = entity
        .get("author")
        .and_then(|a| a.get("name"))
        .or_else(|| entity.get("authorText"))
        .map(plain_text);
    out.push(RecordCandidate {
        id,
        parent_id: first_str(entity, &["commentParentId"]),
        text: record_text(entity),
        author: author.filter(|a| !a.is_empty()),
    });
}

/// Entity-keyed record: `payload.commentEntityPayload`, usually inside a mutation batch.
fn match_entity_payload(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
    let Some(payload) = node
        .get("payload")
        .and_then(|p| p.get("commentEntityPayload"))
        .and_then(Value::as_object)
    else {
        return;
    };
    let props = payload
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(payload);
    let id = first_str(props, &["commentId"])
        .or_else(|| first_str(payload, &["commentId"]))
        .or_else(|| first_str(props, &["key"]))
        .or_else(|| first_str(payload, &["key"]));
    let text = match props.get("content") {
        Some(Value::Object(content)) => match content.get("content").and_then(Value::as_str) {
            Some(plain) => plain.trim().to_string(),
            None => record_text(content),
        },
        _ => record_text(props),
    };
    let author = payload
        .get("author")
        .and_then(|a| dig_str(a, &["displayName"]))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    out.push(RecordCandidate {
        id,
        parent_id: first_str(props, &["commentParentId"]),
        text,
        author,
    });
}

fn renderer_candidate(cr: &Map<String, Value>, parent_id: Option<&str>) -> Option<RecordCandidate> {
    let id = first_str(cr, &["commentId"])?;
    let author = cr
        .get("authorText")
        .map(plain_text)
        .filter(|a| !a.is_empty());
    Some(RecordCandidate {
        id: Some(id),
        parent_id: parent_id.map(str::to_string),
        text: record_text(cr),
        author,
    })
}

fn view_model_candidate(vm: &Map<String, Value>, parent_id: Option<&str>) -> Option<RecordCandidate> {
    let id = first_str(vm, &["commentId", "id"])?;
    let author = vm
        .get("authorText")
        .or_else(|| vm.get("author").and_then(|a| a.get("name")))
        .map(plain_text)
        .filter(|a| !a.is_empty());
    Some(RecordCandidate {
        id: Some(id),
        parent_id: parent_id.map(str::to_string),
        text: record_text(vm),
        author,
    })
}

fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
