use std::time::Instant;

use crate::{ContinuationToken, RecordCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Entry point resolved: seed tokens plus any records the seeding responses carried.
    Seeded {
        tokens: Vec<ContinuationToken>,
        records: Vec<RecordCandidate>,
        at: Instant,
    },
    /// Seeding could not produce a frontier; the harvest aborts.
    SeedingFailed { error: String },
    /// Top of a draining iteration: evaluate breakers and pick the next token.
    Tick { at: Instant },
    /// Result of the fetch requested by `Effect::Fetch`.
    StepCompleted {
        token: ContinuationToken,
        outcome: StepOutcome,
        at: Instant,
    },
    /// Cooperative abort, observed at the top of the next iteration.
    AbortRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Fetched {
        records: Vec<RecordCandidate>,
        tokens: Vec<ContinuationToken>,
    },
    /// Every cascade attempt failed; the token's subtree is lost.
    Failed { reason: String },
}
