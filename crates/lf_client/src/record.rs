use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use glam::Vec2;
use image::RgbaImage;
use lf_core::color::Palette;
use lf_protocol::{Facing, ImageKind};

/// Pixels per world unit when sizing a drawing in the scene.
pub const PIXELS_PER_UNIT: f32 = 100.0;
/// Mip level the palette is sampled from.
pub const PALETTE_MIP_LEVEL: u32 = 3;
/// Length of the id prefix of a manifest line.
pub const RECORD_ID_LEN: usize = 36;

/// Stable identity of a drawing. Cheap to clone; everything outside the store
/// refers to records by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Arc<str>);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing decoded yet; `pixels` is the 2x2 placeholder.
    Placeholder,
    Decoded,
    /// The latest file version could not be decoded. Previous pixels are kept.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: RecordId,
    pub path: PathBuf,
    pub kind: ImageKind,
    pub facing: Facing,
    /// World-space size. Zero until the first successful decode.
    pub dimensions: Vec2,
    pub last_modified: Option<SystemTime>,
    pub palette: Palette,
    pub pixels: RgbaImage,
    pub load_state: LoadState,
}

impl ImageRecord {
    pub fn new(id: RecordId, root: &Path, kind: ImageKind, facing: Facing) -> Self {
        let path = root.join(format!("{id}.png"));
        Self {
            id,
            path,
            kind,
            facing,
            dimensions: Vec2::ZERO,
            last_modified: None,
            palette: Palette::default(),
            pixels: RgbaImage::new(2, 2),
            load_state: LoadState::Placeholder,
        }
    }

    #[cfg(test)]
    pub fn is_decoded(&self) -> bool {
        self.load_state == LoadState::Decoded
    }
}
