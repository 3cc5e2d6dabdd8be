use std::fs;
use std::path::Path;

use anyhow::Context;
use engine_logging::engine_info;
use harvester_engine::HarvestConfig;

/// Defaults when no file is given; otherwise the RON file with unspecified keys defaulted.
pub fn load(path: Option<&Path>) -> anyhow::Result<HarvestConfig> {
    let Some(path) = path else {
        return Ok(HarvestConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: HarvestConfig = ron::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

pub fn apply_overrides(config: &mut HarvestConfig, max_records: Option<usize>) {
    if let Some(max_records) = max_records {
        config.max_records = max_records;
    }
}
