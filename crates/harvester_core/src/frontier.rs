use std::collections::{HashSet, VecDeque};

/// Opaque continuation token; equality is exact string equality.
pub type ContinuationToken = String;

/// FIFO queue of pending tokens. A token is accepted at most once for the
/// lifetime of the frontier, even after it has been dequeued.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    queue: VecDeque<ContinuationToken>,
    enqueued: HashSet<ContinuationToken>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the token was new and is now queued.
    pub fn push(&mut self, token: ContinuationToken) -> bool {
        if token.is_empty() || self.enqueued.contains(&token) {
            return false;
        }
        self.enqueued.insert(token.clone());
        self.queue.push_back(token);
        true
    }

    /// Queue every new token, returning how many were accepted.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = ContinuationToken>) -> usize {
        let mut added = 0;
        for token in tokens {
            if self.push(token) {
                added += 1;
            }
        }
        added
    }

    pub fn pop(&mut self) -> Option<ContinuationToken> {
        self.queue.pop_front()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.enqueued.contains(token)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
