//! Per-record render material state.
//!
//! The renderer itself lives outside this crate; what the host tracks is the
//! per-drawing state a material would be built from: the tint and whether the
//! quad is mirrored horizontally. Entries are built on first use and shared by
//! every object spawned from the same drawing.

use std::collections::HashMap;

use lf_core::color::Color;
use lf_protocol::Facing;

use crate::record::{ImageRecord, RecordId};

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialEntry {
    pub tint: Color,
    pub mirrored: bool,
    /// Bumped whenever the source image is re-decoded.
    pub revision: u32,
}

#[derive(Debug, Default)]
pub struct MaterialCache {
    entries: HashMap<RecordId, MaterialEntry>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct-if-absent. An existing entry is returned untouched.
    pub fn get_or_create(&mut self, record: &ImageRecord) -> &mut MaterialEntry {
        self.entries.entry(record.id.clone()).or_insert_with(|| {
            log::debug!("Creating material for {}", record.id);
            MaterialEntry {
                tint: record.palette.dominant,
                mirrored: record.facing == Facing::Left,
                revision: 0,
            }
        })
    }

    pub fn get(&self, id: &RecordId) -> Option<&MaterialEntry> {
        self.entries.get(id)
    }

    /// Flip the mirroring flag in place. No-op without an entry.
    pub fn flip_mirror(&mut self, id: &RecordId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.mirrored = !entry.mirrored;
                true
            }
            None => false,
        }
    }

    /// Pick up a re-decoded image. No-op without an entry.
    pub fn refresh(&mut self, record: &ImageRecord) {
        if let Some(entry) = self.entries.get_mut(&record.id) {
            entry.tint = record.palette.dominant;
            entry.revision = entry.revision.wrapping_add(1);
        }
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<MaterialEntry> {
        self.entries.remove(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
