use harvester_core::{RecordCandidate, RecordStore};
use harvester_engine::{Extractor, ShapeExtractor};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn sorted(mut records: Vec<RecordCandidate>) -> Vec<RecordCandidate> {
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

fn runs(parts: &[&str]) -> Value {
    Value::Array(parts.iter().map(|p| json!({ "text": p })).collect())
}

#[test]
fn thread_renderer_yields_top_record_and_replies() {
    let tree = json!({
        "onResponseReceivedEndpoints": [ { "reloadContinuationItemsCommand": {
            "targetId": "comments-section",
            "continuationItems": [
                { "commentThreadRenderer": {
                    "comment": { "commentRenderer": {
                        "commentId": "top-1",
                        "contentText": { "runs": runs(&["Great ", "video"]) },
                        "authorText": { "simpleText": "@alice" }
                    } },
                    "replies": { "commentRepliesRenderer": { "contents": [
                        { "commentRenderer": {
                            "commentId": "top-1.r1",
                            "contentText": { "simpleText": "agreed" }
                        } }
                    ] } }
                } },
                { "continuationItemRenderer": { "continuationEndpoint": {
                    "continuationCommand": { "token": "NEXT_PAGE_TOKEN_1" }
                } } }
            ]
        } } ]
    });

    let extraction = ShapeExtractor::default().extract(&tree);
    assert!(extraction.has_payload);
    assert_eq!(extraction.scoped_tokens, vec!["NEXT_PAGE_TOKEN_1".to_string()]);

    // Nested renderers are also seen by the single-record matcher; merge folds them.
    let mut ids: Vec<_> = extraction.records.iter().filter_map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids, vec!["top-1".to_string(), "top-1.r1".to_string()]);

    let reply = extraction
        .records
        .iter()
        .find(|r| r.id.as_deref() == Some("top-1.r1") && r.parent_id.is_some())
        .expect("reply with parent");
    assert_eq!(reply.parent_id.as_deref(), Some("top-1"));
    assert_eq!(reply.text, "agreed");

    let top = extraction
        .records
        .iter()
        .find(|r| r.id.as_deref() == Some("top-1"))
        .expect("top record");
    assert_eq!(top.text, "Great video");
    assert_eq!(top.author.as_deref(), Some("@alice"));
}

#[test]
fn entity_mutations_decode_payloads() {
    let tree = json!({
        "frameworkUpdates": { "entityBatchUpdate": { "mutations": [
            { "entityKey": "k1", "payload": { "commentEntityPayload": {
                "properties": {
                    "commentId": "ent-1",
                    "content": { "content": "  entity body  " }
                },
                "author": { "displayName": "@bob" }
            } } },
            { "entityKey": "k2", "payload": { "commentEntityPayload": {
                "properties": {
                    "commentId": "ent-2",
                    "commentParentId": "ent-1",
                    "content": { "content": "nested reply" }
                }
            } } },
            { "entityKey": "k3", "payload": { "engagementToolbarStateEntityPayload": { "likeState": "x" } } }
        ] } }
    });

    let extraction = ShapeExtractor::default().extract(&tree);
    assert!(extraction.has_payload);
    assert_eq!(
        sorted(extraction.records),
        vec![
            RecordCandidate::new("ent-1", "entity body").with_author("@bob"),
            RecordCandidate::new("ent-2", "nested reply").with_parent("ent-1"),
        ]
    );
}

#[test]
fn comment_entity_and_view_model_shapes() {
    let tree = json!({
        "items": [
            { "payload": { "commentEntity": {
                "key": "entity-key-9",
                "contentText": { "runs": runs(&["from ", "entity"]) },
                "author": { "name": { "simpleText": "@carol" } }
            } } },
            { "commentViewModel": {
                "commentId": "vm-1",
                "content": { "content": "view model text" },
                "authorText": "@dave"
            } }
        ]
    });

    let extraction = ShapeExtractor::default().extract(&tree);
    assert_eq!(
        sorted(extraction.records),
        vec![
            RecordCandidate::new("entity-key-9", "from entity").with_author("@carol"),
            RecordCandidate::new("vm-1", "view model text").with_author("@dave"),
        ]
    );
}

#[test]
fn view_model_keys_never_become_text() {
    let tree = json!({
        "onResponseReceivedEndpoints": [ { "reloadContinuationItemsCommand": {
            "targetId": "comments-section",
            "continuationItems": [ { "commentThreadRenderer": {
                "commentViewModel": { "commentViewModel": {
                    "commentId": "UgxAbc123",
                    "commentKey": "EgsSC2RRdzR3OVdnWGNRGAYyJSIRIgtkUXc0dzlXZ1hjUTAAeAJCEGNvbW1lbnQtcmVwbGllcw",
                    "toolbarStateKey": "Eg0SC2RRdzR3OVdnWGNRIAAoAQ%3D%3D",
                    "commentSurfaceKey": "EgsSC2RRdzR3OVdnWGNRGAYyJSIRIgtkUXc0dzlXZ1hjUTAAeAI%3D"
                } }
            } } ]
        } } ],
        "frameworkUpdates": { "entityBatchUpdate": { "mutations": [
            { "entityKey": "EgsSC2RRdzR3OVdnWGNRGAYyJSIRIgtkUXc0dzlXZ1hjUTAAeAJCEGNvbW1lbnQtcmVwbGllcw",
              "payload": { "commentEntityPayload": {
                "properties": { "commentId": "UgxAbc123", "content": { "content": "nice video" } },
                "author": { "displayName": "@erin" }
            } } }
        ] } }
    });

    let extraction = ShapeExtractor::default().extract(&tree);
    let mut store = RecordStore::new();
    store.merge_all(extraction.records);

    assert_eq!(store.len(), 1);
    let record = store.get("UgxAbc123").expect("merged record");
    assert_eq!(record.text, "nice video");
    assert_eq!(record.author.as_deref(), Some("@erin"));
}

#[test]
fn longest_encoding_wins_for_one_record() {
    let tree = json!({ "commentRenderer": {
        "commentId": "long-1",
        "contentText": { "simpleText": "short" },
        "expandedContentText": { "runs": runs(&["the ", "full ", "expanded ", "text"]) }
    } });
    let extraction = ShapeExtractor::default().extract(&tree);
    assert_eq!(extraction.records[0].text, "the full expanded text");
}

#[test]
fn permissive_pass_sees_tokens_the_scoped_pass_skips() {
    let tree = json!({
        "secondaryResults": { "results": [ { "continuationItemRenderer": {
            "continuationEndpoint": { "continuationCommand": { "token": "RELATED_PAGE_TOKEN" } }
        } } ] },
        "commentSection": { "nextContinuationData": { "continuation": "COMMENT_PAGE_TOKEN" } }
    });

    let extraction = ShapeExtractor::default().extract(&tree);
    assert_eq!(extraction.scoped_tokens, vec!["COMMENT_PAGE_TOKEN".to_string()]);
    let mut union = extraction.tokens();
    union.sort();
    assert_eq!(
        union,
        vec!["COMMENT_PAGE_TOKEN".to_string(), "RELATED_PAGE_TOKEN".to_string()]
    );
    assert!(extraction.records.is_empty());
    assert!(!extraction.has_payload);
}

#[test]
fn malformed_trees_never_panic() {
    let extractor = ShapeExtractor::default();
    for tree in [
        Value::Null,
        json!(42),
        json!("commentRenderer"),
        json!({ "commentRenderer": null }),
        json!({ "commentRenderer": { "commentId": 7, "contentText": [1, 2] } }),
        json!({ "commentThreadRenderer": { "replies": { "commentRepliesRenderer": { "contents": "x" } } } }),
        json!({ "payload": { "commentEntityPayload": { "properties": [] } } }),
    ] {
        let extraction = extractor.extract(&tree);
        assert!(extraction.records.iter().all(|r| r.id.as_deref() != Some("")));
    }

    let mut deep = json!({ "commentRenderer": { "commentId": "deep", "contentText": "bottom" } });
    for _ in 0..2_000 {
        let mut map = Map::new();
        map.insert("child".into(), deep);
        deep = Value::Object(map);
    }
    assert!(extractor.extract(&deep).records.is_empty());
}

#[test]
fn custom_matcher_extends_the_set() {
    fn legacy_shape(node: &Map<String, Value>, out: &mut Vec<RecordCandidate>) {
        if let Some(legacy) = node.get("legacyComment") {
            if let (Some(id), Some(body)) = (
                legacy.get("cid").and_then(Value::as_str),
                legacy.get("body").and_then(Value::as_str),
            ) {
                out.push(RecordCandidate::new(id, body));
            }
        }
    }

    let tree = json!({ "list": [ { "legacyComment": { "cid": "old-1", "body": "from the archive" } } ] });
    assert!(ShapeExtractor::default().extract(&tree).records.is_empty());
    let extraction = ShapeExtractor::default()
        .with_matcher(legacy_shape)
        .extract(&tree);
    assert_eq!(
        extraction.records,
        vec![RecordCandidate::new("old-1", "from the archive")]
    );
}
