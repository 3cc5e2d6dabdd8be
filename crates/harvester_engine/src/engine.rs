use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::harvest::Harvester;
use crate::sink::ChannelProgressSink;
use crate::types::{EngineEvent, HarvestId};

enum HarvestCommand {
    Start {
        harvest_id: HarvestId,
        seed: Option<String>,
    },
    Cancel,
}

/// Runs harvests on a background runtime. Starting a harvest cancels the one in progress,
/// so two harvests never write into the same record store.
pub struct HarvestHandle {
    cmd_tx: mpsc::Sender<HarvestCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl HarvestHandle {
    pub fn new(harvester: Harvester) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let harvester = Arc::new(harvester);

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut current: Option<CancellationToken> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    HarvestCommand::Start { harvest_id, seed } => {
                        if let Some(previous) = current.take() {
                            previous.cancel();
                        }
                        let cancel = CancellationToken::new();
                        current = Some(cancel.clone());
                        let harvester = harvester.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let sink = ChannelProgressSink::new(harvest_id, event_tx.clone());
                            let response = harvester.harvest(seed.as_deref(), &sink, &cancel).await;
                            let _ = event_tx.send(EngineEvent::Completed {
                                harvest_id,
                                response,
                            });
                        });
                    }
                    HarvestCommand::Cancel => {
                        if let Some(previous) = current.take() {
                            previous.cancel();
                        }
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self, harvest_id: HarvestId, seed: Option<String>) {
        let _ = self.cmd_tx.send(HarvestCommand::Start { harvest_id, seed });
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(HarvestCommand::Cancel);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
