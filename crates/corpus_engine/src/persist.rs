//! Artifact files on disk: output directories and all-or-nothing writes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {} is unusable: {reason}", path.display())]
    OutputDir { path: PathBuf, reason: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create `dir` when missing and check that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(unusable("not a directory".to_string())),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
        }
        Err(err) => return Err(unusable(err.to_string())),
    }
    NamedTempFile::new_in(dir).map_err(|e| unusable(e.to_string()))?;
    Ok(())
}

/// Writes whole files into one directory.
///
/// Content goes to a temporary sibling first and is renamed over the target,
/// so readers see either the previous artifact or the complete new one.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_bytes(filename, content.as_bytes())
    }

    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let target = self.dir.join(filename);
        let failed = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(failed)?;
        tmp.write_all(content)
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(failed)?;
        // persist() replaces an existing target, which is what reruns rely on.
        tmp.persist(&target).map_err(|e| failed(e.error))?;
        Ok(target)
    }
}
