use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "harvest", version, about = "Harvest the complete comment set of a watch page")]
#[command(group(ArgGroup::new("source").required(true).args(["url", "page_file"])))]
pub struct Cli {
    /// Watch page URL; the page is fetched to obtain session values and the initial document.
    #[arg(long)]
    pub url: Option<String>,

    /// Saved watch page HTML to read session values from instead of fetching the page.
    #[arg(long)]
    pub page_file: Option<PathBuf>,

    /// Content id used only when the page offers no richer entry point.
    #[arg(long)]
    pub seed: Option<String>,

    /// RON file with harvest settings; missing keys keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the records are exported to.
    #[arg(long, default_value = "harvest_out")]
    pub out: PathBuf,

    /// Export one text line per record instead of full JSON records.
    #[arg(long)]
    pub text_only: bool,

    /// Overrides `max_records` from the config file.
    #[arg(long)]
    pub max_records: Option<usize>,

    #[arg(long, default_value = "info", value_parser = parse_level_arg)]
    pub log_level: LevelFilter,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn parse_level_arg(value: &str) -> Result<LevelFilter, String> {
    engine_logging::parse_level(value).ok_or_else(|| format!("unknown log level '{value}'"))
}
