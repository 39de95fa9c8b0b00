use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::ContentKind;

/// One metadata line per archived item. Field names on the wire follow the
/// corpus log format (`url`, `downloaded_from`, `saved_as`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(rename = "url")]
    pub original_url: String,
    #[serde(rename = "downloaded_from")]
    pub served_from: String,
    #[serde(rename = "saved_as")]
    pub saved_path: String,
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    pub title: String,
    pub sha256: String,
    pub saved_at: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata log io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("metadata record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for [`PersistedRecord`]s.
pub trait RecordSink: Send + Sync {
    /// Drop everything recorded so far; called once at the start of a run.
    fn reset(&self) -> Result<(), MetadataError>;
    fn append(&self, record: &PersistedRecord) -> Result<(), MetadataError>;
}

/// Line-delimited JSON log; appends are serialized through a mutex.
#[derive(Debug)]
pub struct JsonlMetadataLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlMetadataLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    fn io_error(&self, source: io::Error) -> MetadataError {
        MetadataError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordSink for JsonlMetadataLog {
    fn reset(&self) -> Result<(), MetadataError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        *self.file.lock().unwrap_or_else(|e| e.into_inner()) = Some(file);
        Ok(())
    }

    fn append(&self, record: &PersistedRecord) -> Result<(), MetadataError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| self.io_error(e))?;
            *guard = Some(file);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }
}

/// Parse every record of a metadata log.
pub fn read_metadata_log(path: &Path) -> Result<Vec<PersistedRecord>, MetadataError> {
    let io_error = |source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> PersistedRecord {
        PersistedRecord {
            original_url: url.to_string(),
            served_from: url.to_string(),
            saved_path: "data/html/a.html".to_string(),
            kind: ContentKind::Html,
            title: "A".to_string(),
            sha256: "00".repeat(32),
            saved_at: "2024-01-31T12:00:00Z".to_string(),
            tags: vec!["techdocs".to_string()],
        }
    }

    #[test]
    fn wire_format_uses_log_field_names() {
        let value = serde_json::to_value(record("https://a.example/")).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "content_type",
                "downloaded_from",
                "saved_as",
                "saved_at",
                "sha256",
                "tags",
                "title",
                "url"
            ]
        );
        assert_eq!(value["content_type"], "html");
    }

    #[test]
    fn reset_truncates_previous_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("metadata.jsonl");
        let log = JsonlMetadataLog::new(path.clone());

        log.reset().unwrap();
        log.append(&record("https://a.example/")).unwrap();
        log.append(&record("https://b.example/")).unwrap();
        assert_eq!(read_metadata_log(&path).unwrap().len(), 2);

        log.reset().unwrap();
        log.append(&record("https://c.example/")).unwrap();
        let records = read_metadata_log(&path).unwrap();
        assert_eq!(records, vec![record("https://c.example/")]);
    }
}
