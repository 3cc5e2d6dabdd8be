//! Text decoding for the several encodings a display string can take.
use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::tree::{dig, dig_str};

/// Keys that carry the record body in the known shapes, most specific first.
const TEXT_KEYS: [&str; 6] = [
    "expandedContentText",
    "originalText",
    "contentText",
    "attributedText",
    "content",
    "text",
];

/// Upper bound on nodes inspected by one longest-text search.
const MAX_TEXT_NODES: usize = 4_096;

/// Text of a record-bearing node.
///
/// Looks at the known body keys first; when none of them decodes, falls back to the
/// longest encoded text found below the node. Bare strings in the fallback are ids and
/// keys, never body text, so they are skipped.
pub fn record_text(node: &Map<String, Value>) -> String {
    let primary = TEXT_KEYS
        .iter()
        .filter_map(|key| node.get(*key))
        .map(longest_text)
        .fold(String::new(), longer);
    if !primary.is_empty() {
        return primary;
    }
    node.values()
        .filter(|value| value.is_object() || value.is_array())
        .map(longest_text)
        .fold(String::new(), longer)
}

/// Short display strings such as author names.
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => {
            if let Some(simple) = map.get("simpleText").and_then(Value::as_str) {
                return simple.trim().to_string();
            }
            if let Some(runs) = map.get("runs").and_then(Value::as_array) {
                return runs_text(runs).trim().to_string();
            }
            if let Some(content) = map.get("content").and_then(Value::as_str) {
                return content.trim().to_string();
            }
            longest_text(value)
        }
        _ => String::new(),
    }
}

/// Breadth-first search for the longest trimmed text under `value`.
///
/// The same logical string often appears in several encodings at different depths
/// (a styled run list and its accessibility label, for example); the longest one wins.
pub fn longest_text(value: &Value) -> String {
    let mut best = String::new();
    let mut queue = VecDeque::from([value]);
    let mut visited = 0;

    while let Some(current) = queue.pop_front() {
        visited += 1;
        if visited > MAX_TEXT_NODES {
            break;
        }
        match current {
            Value::String(s) if visited == 1 => consider(&mut best, s),
            Value::Array(items) => queue.extend(items.iter()),
            Value::Object(map) => {
                for candidate in object_texts(map) {
                    consider(&mut best, &candidate);
                }
                queue.extend(map.values().filter(|v| v.is_object() || v.is_array()));
            }
            _ => {}
        }
    }
    best
}

fn object_texts(map: &Map<String, Value>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(simple) = map.get("simpleText").and_then(Value::as_str) {
        out.push(simple.to_string());
    }
    if let Some(runs) = map.get("runs").and_then(Value::as_array) {
        out.push(runs_text(runs));
    }
    if let Some(elements) = map
        .get("document")
        .and_then(|doc| doc.get("elements"))
        .and_then(Value::as_array)
    {
        out.push(elements_text(elements));
    }
    if let Some(content) = map.get("content").and_then(Value::as_str) {
        out.push(content.to_string());
    }
    if let Some(label) = map
        .get("accessibility")
        .and_then(|a| dig_str(a, &["accessibilityData", "label"]))
    {
        out.push(label.to_string());
    }
    out
}

/// Concatenate styled runs; emoji runs contribute their shortcut or label.
pub fn runs_text(runs: &[Value]) -> String {
    runs.iter()
        .map(|run| match run.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => run.get("emoji").map(emoji_text).unwrap_or_default(),
        })
        .collect()
}

/// Concatenate a document element list of text and emoji runs.
pub fn elements_text(elements: &[Value]) -> String {
    elements
        .iter()
        .map(|el| {
            if let Some(run) = el.get("textRun") {
                run.get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            } else if let Some(emoji) = el.get("emojiRun").and_then(|r| r.get("emoji")) {
                emoji_text(emoji)
            } else {
                String::new()
            }
        })
        .collect()
}

fn emoji_text(emoji: &Value) -> String {
    emoji
        .get("shortcuts")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        .and_then(Value::as_str)
        .or_else(|| emoji.get("altText").and_then(Value::as_str))
        .or_else(|| {
            dig(emoji, &["image", "accessibility", "accessibilityData", "label"])
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
        .to_string()
}

fn consider(best: &mut String, candidate: &str) {
    let trimmed = candidate.trim();
    if trimmed.chars().count() > best.chars().count() {
        *best = trimmed.to_string();
    }
}

fn longer(a: String, b: String) -> String {
    if b.chars().count() > a.chars().count() {
        b
    } else {
        a
    }
}
