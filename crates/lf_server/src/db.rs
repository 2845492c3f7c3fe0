//! JSON file database.
//!
//! The whole state (command counters and drawings) lives in memory and is
//! written out after every mutation. Writes go to a sibling `.tmp` file that
//! is then renamed over the real one, so a crash mid-write leaves the previous
//! state intact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::CommandTable;
use crate::drawings::DrawingTable;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to read database '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse database '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode database: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write database '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DbData {
    #[serde(default)]
    pub commands: CommandTable,
    #[serde(default)]
    pub drawings: DrawingTable,
}

pub struct Database {
    path: Option<PathBuf>,
    pub data: DbData,
}

impl Database {
    /// Load `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let data = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| DbError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| DbError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            log::info!("No database at '{}', starting empty", path.display());
            DbData::default()
        };
        log::info!(
            "Opened database '{}' ({} command entries, {} drawings)",
            path.display(),
            data.commands.len(),
            data.drawings.len()
        );
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    /// Never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: DbData::default(),
        }
    }

    pub fn save(&self) -> Result<(), DbError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.data)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| DbError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let temp_path = temporary_path(path);
        fs::write(&temp_path, text).map_err(|source| DbError::Write {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, path).map_err(|source| DbError::Write {
            path: path.clone(),
            source,
        })
    }
}

pub(crate) fn temporary_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("db.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

/// Server clock in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
