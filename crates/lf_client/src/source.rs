//! File access for the record store.
//!
//! The store never touches `std::fs` directly: everything goes through
//! `ImageSource`, so scans can be driven against an in-memory directory in
//! tests.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

pub trait ImageSource {
    /// Modification time, or `None` when the file does not exist.
    fn modified(&self, path: &Path) -> Option<SystemTime>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskSource;

impl ImageSource for DiskSource {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}
