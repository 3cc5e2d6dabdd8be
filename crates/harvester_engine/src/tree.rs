//! Bounded walk over untyped JSON response trees.
use serde_json::{Map, Value};

/// Recursion ceiling; deeper subtrees are skipped rather than failing the walk.
pub const MAX_DEPTH: usize = 256;

/// Where a visited object sits in the tree.
pub struct NodeContext<'a, 'p> {
    /// Object keys from the root to this node; array hops are not recorded.
    pub path: &'p [&'a str],
    /// True when an ancestor key or identifier ties this node to the records domain.
    pub scoped: bool,
}

impl NodeContext<'_, '_> {
    pub fn path_mentions(&self, needle: &str) -> bool {
        self.path
            .iter()
            .any(|key| key.to_ascii_lowercase().contains(needle))
    }
}

/// Visit every object in `root` depth-first, parents before children.
pub fn walk_objects<'a, F>(root: &'a Value, mut visit: F)
where
    F: FnMut(&'a Map<String, Value>, &NodeContext<'a, '_>),
{
    let mut path = Vec::new();
    walk_inner(root, 0, false, &mut path, &mut visit);
}

fn walk_inner<'a, F>(
    value: &'a Value,
    depth: usize,
    inherited: bool,
    path: &mut Vec<&'a str>,
    visit: &mut F,
) where
    F: FnMut(&'a Map<String, Value>, &NodeContext<'a, '_>),
{
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            let scoped = inherited || is_records_node(map);
            visit(
                map,
                &NodeContext {
                    path: path.as_slice(),
                    scoped,
                },
            );
            for (key, child) in map {
                if !(child.is_object() || child.is_array()) {
                    continue;
                }
                let child_scoped = scoped || is_records_key(key);
                path.push(key.as_str());
                walk_inner(child, depth + 1, child_scoped, path, visit);
                path.pop();
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_inner(item, depth + 1, inherited, path, visit);
            }
        }
        _ => {}
    }
}

pub fn is_records_key(key: &str) -> bool {
    key.to_ascii_lowercase().contains("comment")
}

/// Section identifiers that mark the comment section of a page.
pub fn is_records_target_id(id: &str) -> bool {
    let id = id.to_ascii_lowercase();
    id.contains("comment")
}

fn is_records_node(map: &Map<String, Value>) -> bool {
    ["panelIdentifier", "identifier", "targetId", "sectionIdentifier"]
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .any(is_records_target_id)
}

/// Follow a chain of object keys.
pub fn dig<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |current, key| current.get(*key))
}

pub fn dig_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    dig(value, keys).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_flows_from_keys_and_identifiers() {
        let tree = json!({
            "header": { "a": {} },
            "commentSection": { "inner": { "x": 1 } },
            "panel": { "panelIdentifier": "engagement-panel-comments-section", "content": { "y": {} } }
        });
        let mut seen = Vec::new();
        walk_objects(&tree, |_, ctx| {
            seen.push((ctx.path.join("."), ctx.scoped));
        });
        assert!(seen.contains(&("header.a".to_string(), false)));
        assert!(seen.contains(&("commentSection.inner".to_string(), true)));
        assert!(seen.contains(&("panel".to_string(), true)));
        assert!(seen.contains(&("panel.content.y".to_string(), true)));
    }

    #[test]
    fn deep_trees_are_cut_off_without_panicking() {
        let mut tree = json!({});
        for _ in 0..(MAX_DEPTH * 2) {
            tree = json!({ "n": tree });
        }
        let mut count = 0;
        walk_objects(&tree, |_, _| count += 1);
        assert!(count <= MAX_DEPTH + 1);
    }
}
