use std::sync::mpsc;

use crate::types::{EngineEvent, HarvestEvent, HarvestId};

/// Fire-and-forget progress delivery; a missing consumer is not an error.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

pub struct ChannelProgressSink {
    harvest_id: HarvestId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(harvest_id: HarvestId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { harvest_id, tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: HarvestEvent) {
        let _ = self.tx.send(EngineEvent::Progress {
            harvest_id: self.harvest_id,
            event,
        });
    }
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: HarvestEvent) {}
}
