//! The drawing manifest (`index.txt`).
//!
//! One line per image. The first 36 characters are the image id; the kind and
//! facing characters sit at fixed offsets from the end of the line:
//!
//! ```text
//! 3fae1c2e-0b7d-4f5e-9a51-000000000000-a-l
//!                                      ^ ^
//!                                 len-3  len-1
//! ```
//!
//! Parsing is all-or-nothing: a single bad line fails the whole load so the
//! store keeps its previous entry list instead of half of a new one.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use lf_protocol::{Facing, ImageKind, ParseError};
use thiserror::Error;

use crate::record::{RecordId, RECORD_ID_LEN};
use crate::source::ImageSource;

/// Shortest line that carries an id plus the `k?f` suffix.
const MIN_LINE_LEN: usize = RECORD_ID_LEN + 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: RecordId,
    pub kind: ImageKind,
    pub facing: Facing,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("manifest line {line}: expected at least {min} characters, got {len}", min = MIN_LINE_LEN)]
    LineTooShort { line: usize, len: usize },
    #[error("manifest line {line}: {source}")]
    BadChar { line: usize, source: ParseError },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }
            entries.push(parse_line(line, index + 1)?);
        }
        Ok(Self { entries })
    }

    pub fn load(source: &dyn ImageSource, path: &Path) -> Result<Self, ManifestError> {
        let text = source.read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn to_line(entry: &ManifestEntry) -> String {
        format!(
            "{}-{}-{}",
            entry.id,
            entry.kind.to_char(),
            entry.facing.to_char()
        )
    }

    /// Newline-terminated text form, one line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&Self::to_line(entry));
            out.push('\n');
        }
        out
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id.as_str() == id)
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<ManifestEntry, ManifestError> {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    if len < MIN_LINE_LEN {
        return Err(ManifestError::LineTooShort { line: line_no, len });
    }
    let id: String = chars[..RECORD_ID_LEN].iter().collect();
    let bad_char = |source| ManifestError::BadChar {
        line: line_no,
        source,
    };
    let kind = ImageKind::from_char(chars[len - 3]).map_err(bad_char)?;
    let facing = Facing::from_char(chars[len - 1]).map_err(bad_char)?;
    Ok(ManifestEntry {
        id: RecordId::from(id),
        kind,
        facing,
    })
}

/// Polls the manifest's modification time. Reports a reload once when the file
/// first appears and once per newer mtime after that.
pub struct ManifestWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl ManifestWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_seen_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_reload(&mut self, source: &dyn ImageSource) -> bool {
        let current = source.modified(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}
