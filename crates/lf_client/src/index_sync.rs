//! Mirrors approved drawings from the server into the local image directory.
//!
//! Each sync asks `GET /drawingindex/{since}` for drawings approved or removed
//! since the last successful sync, downloads or deletes their PNGs and then
//! rewrites the manifest. The record store picks the changes up on its next
//! scan cycle like any other edit.
//!
//! Files are written to a `.tmp` sibling and renamed into place, so the store
//! never decodes a half-written PNG or parses a truncated manifest.
//!
//! A change that cannot be applied (bad id, missing PNG on the server, disk
//! error) is logged and skipped; the rest of the batch still lands and the
//! cursor moves on. Only a failed index request or manifest read/write keeps
//! the cursor, and then the whole batch is retried.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lf_protocol::{IndexChange, IndexResponse};
use thiserror::Error;

use crate::manifest::{Manifest, ManifestEntry, ManifestError};
use crate::record::RecordId;
use crate::transport::TransportError;

#[allow(async_fn_in_trait)]
pub trait IndexTransport {
    async fn index(&self, since: i64) -> Result<IndexResponse, TransportError>;
    async fn image(&self, uuid: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("file operation on '{path}' failed: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("refusing unsafe drawing id '{0}'")]
    UnsafeId(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub manifest_written: bool,
}

pub struct IndexSync<T> {
    transport: T,
    image_dir: PathBuf,
    manifest_path: PathBuf,
    cursor: i64,
    interval: Duration,
}

impl<T: IndexTransport> IndexSync<T> {
    pub fn new(transport: T, image_dir: PathBuf, manifest_name: &str, interval: Duration) -> Self {
        let manifest_path = image_dir.join(manifest_name);
        Self {
            transport,
            image_dir,
            manifest_path,
            cursor: 0,
            interval,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub async fn sync_once(&mut self) -> Result<SyncReport, SyncError> {
        let response = self.transport.index(self.cursor).await?;
        let mut report = SyncReport::default();
        if response.changes.is_empty() {
            self.cursor = response.time;
            return Ok(report);
        }

        let mut manifest = read_manifest(&self.manifest_path).await?;
        let before = manifest.clone();
        for change in &response.changes {
            match self.apply_change(&mut manifest, change).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => report.downloaded += 1,
                Err(err) => {
                    log::warn!("Skipping drawing {}: {err}", change.uuid);
                    report.skipped += 1;
                }
            }
        }

        if manifest != before {
            write_atomic(&self.manifest_path, manifest.render().as_bytes()).await?;
            report.manifest_written = true;
        }
        self.cursor = response.time;
        log::info!(
            "Index sync: {} downloaded, {} deleted, {} skipped, {} in manifest",
            report.downloaded,
            report.deleted,
            report.skipped,
            manifest.entries.len()
        );
        Ok(report)
    }

    /// Apply one change to disk and to `manifest`. Returns whether it was a
    /// deletion. On error the manifest is left as it was for this change.
    async fn apply_change(
        &self,
        manifest: &mut Manifest,
        change: &IndexChange,
    ) -> Result<bool, SyncError> {
        validate_id(&change.uuid)?;
        let image_path = self.image_dir.join(format!("{}.png", change.uuid));
        if change.deleted {
            remove_if_present(&image_path).await?;
            manifest.entries.retain(|e| e.id.as_str() != change.uuid);
            return Ok(true);
        }
        let bytes = self.transport.image(&change.uuid).await?;
        write_atomic(&image_path, &bytes).await?;
        upsert(manifest, change);
        Ok(false)
    }

    pub async fn run(mut self) {
        loop {
            if let Err(err) = self.sync_once().await {
                log::warn!("Index sync failed (cursor stays at {}): {err}", self.cursor);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Update an entry in place, or append a new one at the end.
fn upsert(manifest: &mut Manifest, change: &IndexChange) {
    match manifest.position(&change.uuid) {
        Some(index) => {
            let entry = &mut manifest.entries[index];
            entry.kind = change.kind;
            entry.facing = change.facing;
        }
        None => manifest.entries.push(ManifestEntry {
            id: RecordId::from(change.uuid.as_str()),
            kind: change.kind,
            facing: change.facing,
        }),
    }
}

/// Ids become file names and manifest lines, so they must be plain
/// 36-character uuid tokens.
fn validate_id(uuid: &str) -> Result<(), SyncError> {
    let plain = uuid.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    if plain && uuid.len() == crate::record::RECORD_ID_LEN {
        Ok(())
    } else {
        Err(SyncError::UnsafeId(uuid.to_string()))
    }
}

async fn read_manifest(path: &Path) -> Result<Manifest, SyncError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Manifest::parse(&text)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Manifest::default()),
        Err(source) => Err(SyncError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn remove_if_present(path: &Path) -> Result<(), SyncError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SyncError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    path.with_file_name(format!("{file_name}.tmp"))
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| SyncError::Io { path, source }
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }
    let temp = temporary_path(path);
    tokio::fs::write(&temp, bytes).await.map_err(io_err(&temp))?;
    tokio::fs::rename(&temp, path).await.map_err(io_err(path))
}
