use crate::ContinuationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Seeding finished; the frontier holds `frontier` tokens.
    Seeded { frontier: usize, records: usize },
    /// Fetch the given token through the cascade and report back with `Msg::StepCompleted`.
    Fetch { token: ContinuationToken },
    Step(StepReport),
    /// Advisory only: `streak` consecutive steps added no new records.
    NoProgress { streak: usize },
    Finish { reason: StopReason, records: usize },
    Abort { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: usize,
    pub new_tokens: usize,
    pub new_records: usize,
    pub updated_records: usize,
    pub total_records: usize,
    pub frontier: usize,
    pub fetch_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Frontier drained.
    Exhausted,
    /// Frontier drained after the idle window elapsed without progress.
    IdleTimeout,
    StepGuard,
    HardStop,
    MaxRecords,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StopReason::Exhausted => "frontier exhausted",
            StopReason::IdleTimeout => "idle timeout",
            StopReason::StepGuard => "step guard reached",
            StopReason::HardStop => "hard stop timeout",
            StopReason::MaxRecords => "record ceiling reached",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
