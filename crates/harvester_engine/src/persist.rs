use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use harvester_core::Record;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output layout for an exported record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Pretty-printed JSON array of full records.
    Json,
    /// Text-only projection, one record per line.
    Text,
}

impl RecordFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RecordFormat::Json => "json",
            RecordFormat::Text => "txt",
        }
    }
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes whole files through a temp file in the same directory, then renames.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Export `records` as `{stem}.{ext}` in the chosen format.
    pub fn write_records(
        &self,
        stem: &str,
        records: &[Record],
        format: RecordFormat,
    ) -> Result<PathBuf, PersistError> {
        let filename = format!("{}.{}", sanitize_stem(stem), format.extension());
        let content = match format {
            RecordFormat::Json => {
                let mut bytes = serde_json::to_vec_pretty(records)?;
                bytes.push(b'\n');
                bytes
            }
            RecordFormat::Text => text_projection(records).into_bytes(),
        };
        self.write(&filename, &content)
    }
}

/// One line per record; embedded newlines are flattened to spaces.
pub fn text_projection(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        let line: Vec<&str> = record.text.split_whitespace().collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "records".to_string()
    } else {
        cleaned
    }
}
