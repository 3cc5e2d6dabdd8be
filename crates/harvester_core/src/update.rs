use std::time::Instant;

use crate::{Effect, HarvestState, MergeStats, Msg, Phase, StepOutcome, StepReport, StopReason};

/// Pure update function: applies a message to harvest state and returns any effects.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    let effects = match msg {
        Msg::Seeded {
            tokens,
            records,
            at,
        } => {
            if state.phase != Phase::Seeding {
                return (state, Vec::new());
            }
            state.started_at = Some(at);
            state.last_progress_at = Some(at);
            state.store.merge_all(records);
            state.frontier.extend(tokens);
            state.phase = Phase::Draining;
            vec![Effect::Seeded {
                frontier: state.frontier.len(),
                records: state.store.len(),
            }]
        }
        Msg::SeedingFailed { error } => {
            if state.phase != Phase::Seeding {
                return (state, Vec::new());
            }
            state.phase = Phase::Aborted(error.clone());
            vec![Effect::Abort { error }]
        }
        Msg::AbortRequested => {
            state.abort_requested = true;
            if state.phase == Phase::Seeding {
                let error = "cancelled".to_string();
                state.phase = Phase::Aborted(error.clone());
                vec![Effect::Abort { error }]
            } else {
                Vec::new()
            }
        }
        Msg::Tick { at } => {
            if state.phase == Phase::Draining && state.in_flight.is_none() {
                advance(&mut state, at)
            } else {
                Vec::new()
            }
        }
        Msg::StepCompleted { token, outcome, at } => {
            // Only the token handed out by the last `Effect::Fetch` is accepted.
            if state.phase != Phase::Draining || state.in_flight.as_deref() != Some(token.as_str())
            {
                return (state, Vec::new());
            }
            state.in_flight = None;
            complete_step(&mut state, outcome, at)
        }
    };

    (state, effects)
}

fn advance(state: &mut HarvestState, now: Instant) -> Vec<Effect> {
    if state.abort_requested {
        return finish(state, StopReason::Cancelled);
    }
    if state.store.len() >= state.limits.max_records {
        return finish(state, StopReason::MaxRecords);
    }
    let started_at = state.started_at.unwrap_or(now);
    if now.duration_since(started_at) >= state.limits.hard_stop {
        return finish(state, StopReason::HardStop);
    }

    loop {
        if state.frontier.is_empty() {
            let reason = drained_reason(state, now);
            return finish(state, reason);
        }
        if state.steps >= state.limits.step_guard {
            return finish(state, StopReason::StepGuard);
        }
        let Some(token) = state.frontier.pop() else {
            continue;
        };
        state.steps += 1;
        if state.visited.insert(token.clone()) {
            state.in_flight = Some(token.clone());
            return vec![Effect::Fetch { token }];
        }
    }
}

fn drained_reason(state: &HarvestState, now: Instant) -> StopReason {
    let last = state.last_progress_at.unwrap_or(now);
    if now.duration_since(last) >= state.limits.idle_timeout {
        StopReason::IdleTimeout
    } else {
        StopReason::Exhausted
    }
}

fn complete_step(state: &mut HarvestState, outcome: StepOutcome, at: Instant) -> Vec<Effect> {
    let (stats, new_tokens, fetch_failed) = match outcome {
        StepOutcome::Fetched { records, tokens } => {
            let stats = state.store.merge_all(records);
            let added = state.frontier.extend(tokens);
            (stats, added, false)
        }
        StepOutcome::Failed { .. } => (MergeStats::default(), 0, true),
    };

    if stats.touched() > 0 || new_tokens > 0 {
        state.last_progress_at = Some(at);
    }

    let mut effects = vec![Effect::Step(StepReport {
        step: state.steps,
        new_tokens,
        new_records: stats.inserted,
        updated_records: stats.updated,
        total_records: state.store.len(),
        frontier: state.frontier.len(),
        fetch_failed,
    })];

    if stats.inserted == 0 {
        state.zero_progress_streak += 1;
        let threshold = state.limits.zero_progress_threshold;
        if threshold > 0 && state.zero_progress_streak >= threshold {
            effects.push(Effect::NoProgress {
                streak: state.zero_progress_streak,
            });
            state.zero_progress_streak = 0;
        }
    } else {
        state.zero_progress_streak = 0;
    }

    effects
}

fn finish(state: &mut HarvestState, reason: StopReason) -> Vec<Effect> {
    state.phase = Phase::Done(reason);
    vec![Effect::Finish {
        reason,
        records: state.store.len(),
    }]
}
