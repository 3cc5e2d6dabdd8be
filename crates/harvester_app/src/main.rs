mod cli;
mod logging;
mod run;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::{engine_error, engine_info};
use serde_json::json;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log_level, cli.log_file.as_deref());

    let summary = match run::execute(&cli).await {
        Ok(outcome) => {
            engine_info!("Wrote {} records to {:?}", outcome.count, outcome.path);
            json!({ "ok": true, "count": outcome.count, "path": outcome.path.display().to_string() })
        }
        Err(err) => {
            engine_error!("Harvest failed: {err:#}");
            json!({ "ok": false, "error": format!("{err:#}") })
        }
    };

    println!("{summary}");
    if summary["ok"] == json!(true) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
