//! Harvester core: pure harvest state machine, frontier and record store.
mod effect;
mod frontier;
mod msg;
mod record;
mod state;
mod update;

pub use effect::{Effect, StepReport, StopReason};
pub use frontier::{ContinuationToken, Frontier};
pub use msg::{Msg, StepOutcome};
pub use record::{MergeOutcome, MergeStats, Record, RecordCandidate, RecordStore};
pub use state::{HarvestLimits, HarvestState, Phase};
pub use update::update;
