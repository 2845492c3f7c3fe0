//! The image record store.
//!
//! Keeps an in-memory table of drawings in sync with the manifest and the PNG
//! files it names. The store is a `SlicedTask`: the host's `TimeSlicer`
//! resumes it every frame and it advances one small step at a time through a
//! repeating cycle:
//!
//!   1. `CheckManifest` -- reparse the manifest if its mtime advanced
//!   2. `Reconcile(i)`  -- create/refresh the record for manifest entry `i`,
//!                         decoding the PNG when its mtime advanced
//!   3. `Prune(i)`      -- drop record `i` if its file is gone
//!   4. `Reorder`       -- most recently modified first
//!   5. `FlushAdded`    -- announce records created this cycle, then wait a frame
//!
//! `Updated` and `Removed` events are queued as they happen; `Added` events are
//! held back until the whole manifest has been reconciled. The host drains the
//! queue once per frame with `drain_events`.

use std::collections::VecDeque;
use std::path::PathBuf;

use glam::Vec2;
use lf_core::color::{downsample, extract_palette};
use lf_core::scanner::{SlicedTask, StepOutcome};
use thiserror::Error;

use crate::manifest::{Manifest, ManifestEntry, ManifestError, ManifestWatcher};
use crate::materials::MaterialCache;
use crate::record::{ImageRecord, LoadState, RecordId, PALETTE_MIP_LEVEL, PIXELS_PER_UNIT};
use crate::source::ImageSource;

#[derive(Debug, Clone)]
pub enum RecordEvent {
    Added(RecordId),
    Updated(RecordId),
    /// Carries the record as it was just before removal.
    Removed(ImageRecord),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("failed to read '{path}', will retry next cycle: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    CheckManifest,
    Reconcile(usize),
    Prune(usize),
    Reorder,
    FlushAdded,
}

pub struct RecordStore {
    root: PathBuf,
    source: Box<dyn ImageSource>,
    watcher: ManifestWatcher,
    manifest: Manifest,
    records: Vec<ImageRecord>,
    materials: MaterialCache,
    phase: Phase,
    just_added: Vec<RecordId>,
    events: VecDeque<RecordEvent>,
    palette_blend_top: usize,
    cycles: u64,
}

impl RecordStore {
    pub fn new(
        root: impl Into<PathBuf>,
        manifest_name: &str,
        source: Box<dyn ImageSource>,
        palette_blend_top: usize,
    ) -> Self {
        let root = root.into();
        let watcher = ManifestWatcher::new(root.join(manifest_name));
        Self {
            root,
            source,
            watcher,
            manifest: Manifest::default(),
            records: Vec::new(),
            materials: MaterialCache::new(),
            phase: Phase::CheckManifest,
            just_added: Vec::new(),
            events: VecDeque::new(),
            palette_blend_top,
            cycles: 0,
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn get_by_str(&self, id: &str) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id.as_str() == id)
    }

    /// Current table, most recently modified first after each cycle.
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn materials(&self) -> &MaterialCache {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialCache {
        &mut self.materials
    }

    /// Completed scan cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = RecordEvent> + '_ {
        self.events.drain(..)
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    fn check_manifest(&mut self) -> Result<StepOutcome, StoreError> {
        self.phase = Phase::Reconcile(0);
        if self.watcher.should_reload(self.source.as_ref()) {
            match Manifest::load(self.source.as_ref(), self.watcher.path()) {
                Ok(manifest) => {
                    log::info!(
                        "Manifest '{}' reloaded: {} entries",
                        self.watcher.path().display(),
                        manifest.entries.len()
                    );
                    self.manifest = manifest;
                }
                Err(err) => {
                    log::error!("Keeping previous manifest: {err}");
                    self.phase = Phase::CheckManifest;
                    return Err(err.into());
                }
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn reconcile(&mut self, index: usize) -> Result<StepOutcome, StoreError> {
        let Some(entry) = self.manifest.entries.get(index).cloned() else {
            self.phase = Phase::Prune(0);
            return Ok(StepOutcome::Continue);
        };
        self.phase = Phase::Reconcile(index + 1);
        let slot = self.ensure_record(&entry);

        let record = &mut self.records[slot];
        record.kind = entry.kind;
        if record.facing != entry.facing {
            record.facing = entry.facing;
            if self.materials.flip_mirror(&record.id) {
                log::debug!("Flipped material mirroring for {}", record.id);
            }
        }

        let Some(mtime) = self.source.modified(&record.path) else {
            return Ok(StepOutcome::Continue);
        };
        if record.last_modified.is_some_and(|seen| mtime <= seen) {
            return Ok(StepOutcome::Continue);
        }

        let bytes = self
            .source
            .read(&record.path)
            .map_err(|source| StoreError::Read {
                path: record.path.clone(),
                source,
            })?;

        let decoded = match image::load_from_memory(&bytes) {
            Ok(image) => image.to_rgba8(),
            Err(source) => {
                // Remember this version so a corrupt file is not re-read every cycle.
                record.last_modified = Some(mtime);
                record.load_state = LoadState::Failed;
                return Err(StoreError::Decode {
                    path: record.path.clone(),
                    source,
                });
            }
        };

        let (width, height) = decoded.dimensions();
        record.palette = extract_palette(
            &downsample(&decoded, PALETTE_MIP_LEVEL),
            self.palette_blend_top,
        );
        record.dimensions = Vec2::new(width as f32, height as f32) / PIXELS_PER_UNIT;
        record.pixels = decoded;
        record.last_modified = Some(mtime);
        record.load_state = LoadState::Decoded;
        log::debug!("Decoded {} ({width}x{height})", record.id);

        self.events
            .push_back(RecordEvent::Updated(self.records[slot].id.clone()));
        Ok(StepOutcome::YieldFrame)
    }

    fn ensure_record(&mut self, entry: &ManifestEntry) -> usize {
        if let Some(slot) = self.position(&entry.id) {
            return slot;
        }
        let record = ImageRecord::new(entry.id.clone(), &self.root, entry.kind, entry.facing);
        self.records.push(record);
        self.just_added.push(entry.id.clone());
        self.records.len() - 1
    }

    fn prune(&mut self, index: usize) -> StepOutcome {
        let Some(record) = self.records.get(index) else {
            self.phase = Phase::Reorder;
            return StepOutcome::Continue;
        };
        if self.source.modified(&record.path).is_some() {
            self.phase = Phase::Prune(index + 1);
            return StepOutcome::Continue;
        }

        let record = self.records.remove(index);
        self.materials.remove(&record.id);
        if let Some(pending) = self.just_added.iter().position(|id| *id == record.id) {
            // Never announced, so there is nothing to take back.
            self.just_added.remove(pending);
            log::debug!("Dropped {} before it was announced", record.id);
        } else {
            log::info!("Removed {}", record.id);
            self.events.push_back(RecordEvent::Removed(record));
        }
        self.phase = Phase::Prune(index);
        StepOutcome::Continue
    }

    fn reorder(&mut self) -> StepOutcome {
        // Stable, so records with equal mtimes keep manifest order.
        self.records
            .sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        self.phase = Phase::FlushAdded;
        StepOutcome::Continue
    }

    fn flush_added(&mut self) -> StepOutcome {
        if !self.just_added.is_empty() {
            log::info!("{} new record(s), {} total", self.just_added.len(), self.records.len());
        }
        for id in self.just_added.drain(..) {
            self.events.push_back(RecordEvent::Added(id));
        }
        self.cycles += 1;
        self.phase = Phase::CheckManifest;
        StepOutcome::YieldFrame
    }
}

impl SlicedTask for RecordStore {
    type Error = StoreError;

    fn step(&mut self) -> Result<StepOutcome, StoreError> {
        match self.phase {
            Phase::CheckManifest => self.check_manifest(),
            Phase::Reconcile(index) => self.reconcile(index),
            Phase::Prune(index) => Ok(self.prune(index)),
            Phase::Reorder => Ok(self.reorder()),
            Phase::FlushAdded => Ok(self.flush_added()),
        }
    }
}
