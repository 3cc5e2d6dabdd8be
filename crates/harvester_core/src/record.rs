use std::collections::HashMap;

use serde::Serialize;

/// A merged record keyed by its stable `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A partial record as produced by extraction. Candidates without an id cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordCandidate {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub text: String,
    pub author: Option<String>,
}

impl RecordCandidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

impl MergeStats {
    pub fn touched(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Deduplicating store; records keep their first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one candidate.
    ///
    /// Text is only ever replaced by a strictly longer text and the author is only
    /// filled while still empty, so merging is idempotent and never shrinks a record.
    pub fn merge(&mut self, candidate: RecordCandidate) -> MergeOutcome {
        let Some(id) = non_empty(candidate.id) else {
            return MergeOutcome::Rejected;
        };
        let text = candidate.text.trim();
        if text.is_empty() {
            return MergeOutcome::Rejected;
        }
        let author = non_empty(candidate.author);
        let parent_id = non_empty(candidate.parent_id);

        let Some(&slot) = self.index.get(&id) else {
            self.index.insert(id.clone(), self.records.len());
            self.records.push(Record {
                id,
                parent_id,
                text: text.to_owned(),
                author,
            });
            return MergeOutcome::Inserted;
        };

        let existing = &mut self.records[slot];
        let mut changed = false;
        if text.chars().count() > existing.text.chars().count() {
            existing.text = text.to_owned();
            changed = true;
        }
        if existing.author.is_none() && author.is_some() {
            existing.author = author;
            changed = true;
        }
        if existing.parent_id.is_none() && parent_id.is_some() {
            existing.parent_id = parent_id;
            changed = true;
        }

        if changed {
            MergeOutcome::Updated
        } else {
            MergeOutcome::Unchanged
        }
    }

    pub fn merge_all(&mut self, candidates: impl IntoIterator<Item = RecordCandidate>) -> MergeStats {
        let mut stats = MergeStats::default();
        for candidate in candidates {
            match self.merge(candidate) {
                MergeOutcome::Inserted => stats.inserted += 1,
                MergeOutcome::Updated => stats.updated += 1,
                MergeOutcome::Rejected => stats.rejected += 1,
                MergeOutcome::Unchanged => {}
            }
        }
        stats
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&slot| &self.records[slot])
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flattened text-only view in insertion order.
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }

    pub fn finalize(self) -> Vec<Record> {
        self.records
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_is_filled_once() {
        let mut store = RecordStore::new();
        store.merge(RecordCandidate::new("a", "hello"));
        assert_eq!(
            store.merge(RecordCandidate::new("a", "hello").with_parent("p1")),
            MergeOutcome::Updated
        );
        assert_eq!(
            store.merge(RecordCandidate::new("a", "hello").with_parent("p2")),
            MergeOutcome::Unchanged
        );
        assert_eq!(store.get("a").unwrap().parent_id.as_deref(), Some("p1"));
    }

    #[test]
    fn blank_author_does_not_count() {
        let mut store = RecordStore::new();
        store.merge(RecordCandidate::new("a", "hello").with_author("  "));
        assert_eq!(store.get("a").unwrap().author, None);
    }
}
