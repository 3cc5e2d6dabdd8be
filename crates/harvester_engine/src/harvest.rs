//! Async driver: resolves the session, seeds the frontier and executes the
//! effects of the pure traversal state machine until it reports Done.
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{
    update, ContinuationToken, Effect, HarvestState, Msg, Record, RecordCandidate, StepOutcome,
};
use tokio_util::sync::CancellationToken;

use crate::cascade::FetchCascade;
use crate::config::HarvestConfig;
use crate::discovery::EntryDiscovery;
use crate::extract::{Extraction, Extractor, ShapeExtractor};
use crate::fetch::Transport;
use crate::host::HostEnvironment;
use crate::observe::RequestObserver;
use crate::session;
use crate::sink::ProgressSink;
use crate::tokens::TokenSink;
use crate::types::{
    EntryKind, HarvestError, HarvestEvent, HarvestResponse, RequestPayload, SessionContext,
};

/// Stand-in deadline when the configured hard stop overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// Everything the draining phase starts from.
struct Prepared {
    session: SessionContext,
    tokens: Vec<ContinuationToken>,
    records: Vec<RecordCandidate>,
}

pub struct Harvester {
    config: HarvestConfig,
    cascade: FetchCascade,
    host: Arc<dyn HostEnvironment>,
    extractor: Arc<dyn Extractor>,
    observer: Option<Arc<dyn RequestObserver>>,
}

impl Harvester {
    pub fn new(
        config: HarvestConfig,
        transport: Arc<dyn Transport>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        let cascade = FetchCascade::new(transport, config.fetch.base_url.clone(), config.cascade.clone());
        Self {
            config,
            cascade,
            host,
            extractor: Arc::new(ShapeExtractor::default()),
            observer: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Runs one harvest and folds the outcome into the outward response shape.
    pub async fn harvest(
        &self,
        seed: Option<&str>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> HarvestResponse {
        self.run(seed, sink, cancel).await.into()
    }

    pub async fn run(
        &self,
        seed: Option<&str>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, HarvestError> {
        engine_info!("Harvest started (seed: {seed:?})");
        sink.emit(HarvestEvent::Started {
            seed: seed.map(str::to_string),
        });

        let state = HarvestState::new(self.config.limits());
        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HarvestError::Cancelled),
            prepared = self.prepare(seed, sink) => prepared,
        };
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                let msg = match err {
                    HarvestError::Cancelled => Msg::AbortRequested,
                    _ => Msg::SeedingFailed {
                        error: err.to_string(),
                    },
                };
                let (_, effects) = update(state, msg);
                self.report(effects, sink);
                return Err(err);
            }
        };

        let seeded_at = Instant::now();
        let (state, effects) = update(
            state,
            Msg::Seeded {
                tokens: prepared.tokens,
                records: prepared.records,
                at: seeded_at,
            },
        );
        self.report(effects, sink);

        let state = self
            .drain(state, &prepared.session, seeded_at, sink, cancel)
            .await;
        let mut records = state.into_records();
        records.truncate(self.config.max_records);
        Ok(records)
    }

    async fn prepare(
        &self,
        seed: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Prepared, HarvestError> {
        let session = session::resolve(self.host.as_ref(), &self.config.boot).await?;
        let discovery = EntryDiscovery {
            cascade: &self.cascade,
            observer: self.observer.as_deref(),
            observe_window: self.config.observe_window,
        };
        let entry = discovery.discover(&session, self.host.as_ref(), seed).await?;
        sink.emit(HarvestEvent::EntryPoint {
            kind: entry.kind,
            count: entry.values.len(),
        });

        let (tokens, records) = match entry.kind {
            EntryKind::Tokens => (entry.values, Vec::new()),
            EntryKind::Params => self.seed_from_params(&session, &entry.values, seed).await?,
        };
        Ok(Prepared {
            session,
            tokens,
            records,
        })
    }

    /// Params only name a section; fetch each one to obtain real continuation tokens.
    async fn seed_from_params(
        &self,
        session: &SessionContext,
        params: &[String],
        seed: Option<&str>,
    ) -> Result<(Vec<ContinuationToken>, Vec<RecordCandidate>), HarvestError> {
        let mut tokens = TokenSink::default();
        let mut records = Vec::new();

        for value in params {
            let extraction = match self
                .cascade
                .fetch(session, &RequestPayload::Params(value.clone()))
                .await
            {
                Ok(response) => self.extractor.extract(&response),
                Err(err) => {
                    engine_warn!("Params fetch failed: {err}");
                    continue;
                }
            };
            if !self.config.force_drain && !extraction.records.is_empty() {
                engine_info!("First params page carried {} records", extraction.records.len());
                return Ok((Vec::new(), extraction.records));
            }
            self.absorb(extraction, &mut tokens, &mut records);
        }

        let mut tokens = tokens.into_vec();
        if tokens.is_empty() && records.is_empty() {
            let content_id = match seed.filter(|s| !s.is_empty()) {
                Some(seed) => Some(seed.to_string()),
                None => self.host.content_id().await,
            };
            if let Some(content_id) = content_id {
                engine_debug!("Params yielded nothing; falling back to content id {content_id}");
                match self
                    .cascade
                    .fetch(session, &RequestPayload::ContentId(content_id))
                    .await
                {
                    Ok(response) => {
                        let mut sink = TokenSink::default();
                        self.absorb(self.extractor.extract(&response), &mut sink, &mut records);
                        tokens = sink.into_vec();
                    }
                    Err(err) => engine_warn!("Content id fetch failed: {err}"),
                }
            }
        }

        if tokens.is_empty() && records.is_empty() {
            return Err(HarvestError::NoEntryPoint);
        }
        Ok((tokens, records))
    }

    fn absorb(&self, extraction: Extraction, tokens: &mut TokenSink, records: &mut Vec<RecordCandidate>) {
        if self.config.force_drain {
            tokens.extend(extraction.tokens().iter().map(String::as_str));
        } else {
            tokens.extend(extraction.scoped_tokens.iter().map(String::as_str));
        }
        records.extend(extraction.records);
    }

    async fn drain(
        &self,
        mut state: HarvestState,
        session: &SessionContext,
        seeded_at: Instant,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> HarvestState {
        let deadline = seeded_at
            .checked_add(self.config.hard_stop)
            .unwrap_or_else(|| seeded_at + FAR_FUTURE);
        let deadline = tokio::time::Instant::from_std(deadline);

        while !state.is_finished() {
            if cancel.is_cancelled() {
                state = update(state, Msg::AbortRequested).0;
            }
            let (next, effects) = update(state, Msg::Tick { at: Instant::now() });
            state = next;
            let Some(token) = self.report(effects, sink) else {
                continue;
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => StepOutcome::Failed { reason: "cancelled".to_string() },
                result = tokio::time::timeout_at(deadline, self.step(session, &token)) => {
                    result.unwrap_or_else(|_| StepOutcome::Failed { reason: "hard stop".to_string() })
                }
            };
            let (next, effects) = update(
                state,
                Msg::StepCompleted {
                    token,
                    outcome,
                    at: Instant::now(),
                },
            );
            state = next;
            self.report(effects, sink);

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.throttle) => {}
            }
        }
        state
    }

    async fn step(&self, session: &SessionContext, token: &str) -> StepOutcome {
        match self
            .cascade
            .fetch(session, &RequestPayload::Continuation(token.to_string()))
            .await
        {
            Ok(response) => {
                let extraction = self.extractor.extract(&response);
                if extraction.is_malformed() {
                    if extraction.has_payload {
                        engine_debug!(
                            "Record envelope for token {} decoded to nothing",
                            abbreviate(token)
                        );
                    } else {
                        engine_debug!("Malformed response for token {}", abbreviate(token));
                    }
                }
                let tokens = extraction.tokens();
                StepOutcome::Fetched {
                    records: extraction.records,
                    tokens,
                }
            }
            Err(err) => {
                engine_warn!("Dropping token {}: {err}", abbreviate(token));
                StepOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Publishes effects as events; returns the token to fetch, if any.
    fn report(&self, effects: Vec<Effect>, sink: &dyn ProgressSink) -> Option<ContinuationToken> {
        let mut fetch = None;
        for effect in effects {
            match effect {
                Effect::Fetch { token } => fetch = Some(token),
                Effect::Seeded { frontier, records } => {
                    engine_info!("Seeded frontier with {frontier} tokens, {records} records");
                    sink.emit(HarvestEvent::Seeded { frontier, records });
                }
                Effect::Step(report) => {
                    engine_debug!(
                        "Step {}: +{} records, +{} tokens, frontier {}",
                        report.step,
                        report.new_records,
                        report.new_tokens,
                        report.frontier
                    );
                    sink.emit(HarvestEvent::Step(report));
                }
                Effect::NoProgress { streak } => {
                    let message = format!("no new records for {streak} consecutive steps");
                    engine_warn!("{message}");
                    sink.emit(HarvestEvent::Advisory { message });
                }
                Effect::Finish { reason, records } => {
                    engine_info!("Harvest finished with {records} records ({reason})");
                    sink.emit(HarvestEvent::Finished { records, reason });
                }
                Effect::Abort { error } => {
                    engine_error!("Harvest aborted: {error}");
                    sink.emit(HarvestEvent::Failed { error });
                }
            }
        }
        fetch
    }
}

fn abbreviate(token: &str) -> &str {
    match token.char_indices().nth(24) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}
