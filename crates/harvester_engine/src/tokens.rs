//! Continuation token collection. Two independent passes over the same tree:
//! a scoped pass tied to the records domain and a permissive pass that takes
//! every token-shaped value.
use std::collections::HashSet;

use harvester_core::ContinuationToken;
use serde_json::{Map, Value};

use crate::tree::{dig_str, is_records_target_id, walk_objects};

/// Tokens at or below this length are placeholders, not continuations.
pub const MIN_TOKEN_LEN: usize = 10;

/// Bulk action envelopes that carry further continuation items.
const ACTION_KEYS: [&str; 2] = ["appendContinuationItemsAction", "reloadContinuationItemsCommand"];

pub fn is_token(value: &str) -> bool {
    value.len() > MIN_TOKEN_LEN
}

/// Every token-shaped value anywhere in the tree, in document order.
pub fn collect_permissive(root: &Value) -> Vec<ContinuationToken> {
    let mut sink = TokenSink::default();
    walk_objects(root, |node, _| {
        for token in node_tokens(node) {
            sink.push(token);
        }
    });
    sink.into_vec()
}

/// Tokens whose enclosing node is structurally associated with the records domain.
pub fn collect_scoped(root: &Value) -> Vec<ContinuationToken> {
    let mut sink = TokenSink::default();
    walk_objects(root, |node, ctx| {
        for key in ACTION_KEYS {
            let Some(action) = node.get(key) else {
                continue;
            };
            let targeted = action
                .get("targetId")
                .and_then(Value::as_str)
                .is_some_and(is_records_target_id);
            if targeted || ctx.scoped {
                for token in action_tokens(action) {
                    sink.push(token);
                }
            }
        }

        let endpoint_targeted = dig_str_map(node, &["continuationEndpoint", "targetId"])
            .is_some_and(is_records_target_id);
        if ctx.scoped || endpoint_targeted {
            for token in node_tokens(node) {
                sink.push(token);
            }
        }
    });
    sink.into_vec()
}

/// Items of an append/reload action that carry a continuation renderer.
pub fn action_tokens(action: &Value) -> Vec<&str> {
    action
        .get("continuationItems")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item_token).collect())
        .unwrap_or_default()
}

/// `continuationItemRenderer` token of a list item.
pub fn item_token(item: &Value) -> Option<&str> {
    dig_str(
        item,
        &[
            "continuationItemRenderer",
            "continuationEndpoint",
            "continuationCommand",
            "token",
        ],
    )
    .filter(|token| is_token(token))
}

/// Tokens carried directly by one node, in any of the known encodings.
fn node_tokens(node: &Map<String, Value>) -> Vec<&str> {
    let candidates = [
        dig_str_map(node, &["continuationEndpoint", "continuationCommand", "token"]),
        dig_str_map(node, &["continuationCommand", "token"]),
        dig_str_map(node, &["nextContinuationData", "continuation"]),
        dig_str_map(node, &["reloadContinuationData", "continuation"]),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter(|token| is_token(token))
        .collect()
}

fn dig_str_map<'a>(node: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    let (first, rest) = keys.split_first()?;
    dig_str(node.get(*first)?, rest)
}

/// Order-preserving, duplicate-free token list.
#[derive(Default)]
pub(crate) struct TokenSink {
    seen: HashSet<String>,
    tokens: Vec<ContinuationToken>,
}

impl TokenSink {
    pub(crate) fn push(&mut self, token: &str) {
        if is_token(token) && self.seen.insert(token.to_string()) {
            self.tokens.push(token.to_string());
        }
    }

    pub(crate) fn extend<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>) {
        for token in tokens {
            self.push(token);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<ContinuationToken> {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn continuation_item(token: &str) -> Value {
        json!({ "continuationItemRenderer": { "continuationEndpoint": {
            "continuationCommand": { "token": token }
        } } })
    }

    #[test]
    fn permissive_takes_everything_token_shaped() {
        let tree = json!({
            "sidebar": { "items": [continuation_item("RELATED_VIDEOS_TOKEN")] },
            "legacy": { "nextContinuationData": { "continuation": "LEGACY_NEXT_TOKEN" } },
            "short": continuation_item("tiny")
        });
        let mut tokens = collect_permissive(&tree);
        tokens.sort();
        assert_eq!(tokens, vec!["LEGACY_NEXT_TOKEN", "RELATED_VIDEOS_TOKEN"]);
    }

    #[test]
    fn scoped_ignores_unrelated_sections() {
        let tree = json!({
            "sidebar": { "items": [continuation_item("RELATED_VIDEOS_TOKEN")] },
            "onResponseReceivedEndpoints": [
                { "reloadContinuationItemsCommand": {
                    "targetId": "comments-section",
                    "continuationItems": [continuation_item("COMMENTS_PAGE_TOKEN")]
                } },
                { "appendContinuationItemsAction": {
                    "targetId": "watch-next-feed",
                    "continuationItems": [continuation_item("FEED_PAGE_TOKEN_1")]
                } }
            ],
            "commentRepliesRenderer": { "contents": [continuation_item("REPLIES_PAGE_TOKEN")] }
        });
        let mut tokens = collect_scoped(&tree);
        tokens.sort();
        assert_eq!(tokens, vec!["COMMENTS_PAGE_TOKEN", "REPLIES_PAGE_TOKEN"]);
    }
}
