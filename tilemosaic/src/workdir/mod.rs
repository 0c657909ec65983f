//! Scratch directory for spooled tile payloads.
//!
//! The directory is emptied before a download starts and again when it ends,
//! whichever way it ends. [`WorkDirGuard`] performs the final purge on drop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default working directory, relative to the process working directory.
pub const DEFAULT_WORK_DIR: &str = "downloaded_tiles";

/// Errors from preparing or cleaning the working directory.
#[derive(Debug, Error)]
pub enum WorkDirError {
    #[error("Failed to create working directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Working directory path {0} exists and is not a directory")]
    NotADirectory(PathBuf),
}

/// A directory whose contents belong to one download at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    path: PathBuf,
}

impl WorkingDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the directory if needed and removes leftovers of earlier runs.
    pub fn prepare(&self) -> Result<(), WorkDirError> {
        if self.path.exists() && !self.path.is_dir() {
            return Err(WorkDirError::NotADirectory(self.path.clone()));
        }

        fs::create_dir_all(&self.path).map_err(|source| WorkDirError::Create {
            path: self.path.clone(),
            source,
        })?;

        let removed = self.purge()?;
        debug!(path = %self.path.display(), removed = removed, "Working directory prepared");
        Ok(())
    }

    /// Removes everything inside the directory, keeping the directory.
    ///
    /// Returns the number of entries removed. A missing directory is already
    /// clean.
    pub fn purge(&self) -> Result<usize, WorkDirError> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(WorkDirError::Remove {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|source| WorkDirError::Remove {
                path: self.path.clone(),
                source,
            })?;
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            let result = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(WorkDirError::Remove { path, source }),
            }
        }

        Ok(removed)
    }

    /// Returns a guard that purges the directory when dropped.
    pub fn guard(&self) -> WorkDirGuard {
        WorkDirGuard {
            dir: self.clone(),
        }
    }
}

impl Default for WorkingDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DIR)
    }
}

/// Purges a [`WorkingDirectory`] on drop.
#[derive(Debug)]
pub struct WorkDirGuard {
    dir: WorkingDirectory,
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        match self.dir.purge() {
            Ok(removed) => debug!(
                path = %self.dir.path().display(),
                removed = removed,
                "Working directory cleaned"
            ),
            Err(e) => warn!(
                path = %self.dir.path().display(),
                error = %e,
                "Failed to clean working directory"
            ),
        }
    }
}
