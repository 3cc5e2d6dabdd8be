use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use engine_logging::engine_warn;
use harvester_engine::{
    AtomicFileWriter, Harvester, HostEnvironment, NoopSink, PageSnapshot, RecordFormat,
    ReqwestTransport, StaticHost, WatchPageHost,
};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::settings;

pub struct Outcome {
    pub count: usize,
    pub path: PathBuf,
}

pub async fn execute(cli: &Cli) -> anyhow::Result<Outcome> {
    let mut config = settings::load(cli.config.as_deref())?;
    settings::apply_overrides(&mut config, cli.max_records);

    let transport = Arc::new(
        ReqwestTransport::new(config.fetch.clone()).context("building http client")?,
    );
    let host: Arc<dyn HostEnvironment> = match (&cli.url, &cli.page_file) {
        (Some(url), _) => Arc::new(WatchPageHost::new(transport.clone(), url.clone())?),
        (None, Some(path)) => {
            let html = fs::read_to_string(path)
                .with_context(|| format!("reading page {}", path.display()))?;
            Arc::new(StaticHost::from(PageSnapshot::parse(&html, None)))
        }
        (None, None) => bail!("either --url or --page-file is required"),
    };

    let stem = match &cli.seed {
        Some(seed) => seed.clone(),
        None => host
            .content_id()
            .await
            .unwrap_or_else(|| "records".to_string()),
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("Interrupted; stopping with the records collected so far");
                cancel.cancel();
            }
        }
    });

    let harvester = Harvester::new(config, transport, host);
    let records = harvester
        .run(cli.seed.as_deref(), &NoopSink, &cancel)
        .await?;

    let format = if cli.text_only {
        RecordFormat::Text
    } else {
        RecordFormat::Json
    };
    let path = AtomicFileWriter::new(cli.out.clone())
        .write_records(&stem, &records, format)
        .with_context(|| format!("exporting records to {}", cli.out.display()))?;

    Ok(Outcome {
        count: records.len(),
        path,
    })
}
