//! On-disk layout of a store's backing file pair.
//!
//! Every store owns two co-located files sharing a base name:
//!
//! ```text
//! <base>.log                  <base>.idx
//! ┌─────────────┐             ┌──────────────────┐
//! │ alpha\n     │             │ 0                │  entry 0: sentinel
//! │ beta\n      │             │ 6                │  entry 1: after "alpha\n"
//! │ gamma\n     │             │ 11               │  entry 2: after "beta\n"
//! └─────────────┘             │ 17               │  entry 3: after "gamma\n"
//!                             └──────────────────┘  8-byte big-endian each
//! ```
//!
//! Entry `k` holds the text offset immediately after the k-th line
//! terminator, so line `i` (0-based) occupies the byte range
//! `[entry[i], entry[i+1])` and the line count is always one less than the
//! number of entries. A well-formed index file is a multiple of
//! [`ENTRY_SIZE`] long and never shorter than one entry.
//!
//! Derived search views reuse the same pair layout under a suffixed base
//! name (`<base>-<seq>`), so one pager serves both.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};

/// Extension of the raw text file.
pub const TEXT_EXTENSION: &str = "log";

/// Extension of the line offset index file.
pub const INDEX_EXTENSION: &str = "idx";

/// Size in bytes of one index entry.
pub const ENTRY_SIZE: u64 = 8;

/// Byte that terminates a line. Carriage returns before it are preserved in
/// the text file but excluded when a line is decoded for matching.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Locations of a store's backing file pair.
///
/// Paths are derived on demand from a directory and a base name, so a
/// `StorePaths` can also mint the suffixed pair used by a derived view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    dir: PathBuf,
    base: String,
}

impl StorePaths {
    /// Paths for the pair `<dir>/<base>.log` and `<dir>/<base>.idx`.
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        StorePaths {
            dir: dir.into(),
            base: base.into(),
        }
    }

    /// Path of the raw text file.
    pub fn text(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.base, TEXT_EXTENSION))
    }

    /// Path of the offset index file.
    pub fn index(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.base, INDEX_EXTENSION))
    }

    /// Paths for the derived view pair `<dir>/<base>-<seq>.log` / `.idx`.
    pub fn view(&self, seq: u64) -> StorePaths {
        StorePaths {
            dir: self.dir.clone(),
            base: format!("{}-{}", self.base, seq),
        }
    }

    /// Base name shared by the pair.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Directory holding the pair.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Read the entry at 0-based position `entry` from an index file.
pub(crate) fn read_entry<R: Read + Seek>(index: &mut R, entry: u64) -> io::Result<u64> {
    index.seek(SeekFrom::Start(entry.saturating_mul(ENTRY_SIZE)))?;
    index.read_u64::<BigEndian>()
}

/// Append one entry at the writer's current position.
pub(crate) fn write_entry<W: Write>(index: &mut W, offset: u64) -> io::Result<()> {
    index.write_u64::<BigEndian>(offset)
}

/// Decode a window of consecutive entries read in one sequential pass.
///
/// Trailing bytes that do not fill a whole entry are ignored; callers read
/// aligned windows so in practice there are none.
pub(crate) fn decode_entries(raw: &[u8]) -> Vec<u64> {
    raw.chunks_exact(ENTRY_SIZE as usize)
        .map(BigEndian::read_u64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_paths_follow_pair_naming() {
        let paths = StorePaths::new("/var/data", "crawl");
        assert_eq!(paths.text(), Path::new("/var/data/crawl.log"));
        assert_eq!(paths.index(), Path::new("/var/data/crawl.idx"));
        assert_eq!(paths.base(), "crawl");
    }

    #[test]
    fn test_view_paths_carry_sequence_suffix() {
        let paths = StorePaths::new("/var/data", "crawl");
        let view = paths.view(3);
        assert_eq!(view.text(), Path::new("/var/data/crawl-3.log"));
        assert_eq!(view.index(), Path::new("/var/data/crawl-3.idx"));
        assert_eq!(view.dir(), paths.dir());
    }

    #[test]
    fn test_entry_round_trip() {
        let mut file = Cursor::new(Vec::new());
        write_entry(&mut file, 0).unwrap();
        write_entry(&mut file, 4096).unwrap();
        assert_eq!(read_entry(&mut file, 0).unwrap(), 0);
        assert_eq!(read_entry(&mut file, 1).unwrap(), 4096);
    }

    #[test]
    fn test_entries_are_big_endian_on_disk() {
        let mut file = Cursor::new(Vec::new());
        write_entry(&mut file, 0x0102_0304).unwrap();
        assert_eq!(file.get_ref().as_slice(), &[0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_read_past_end_reports_io_error() {
        let mut file = Cursor::new(vec![0u8; ENTRY_SIZE as usize]);
        assert!(read_entry(&mut file, 5).is_err());
    }

    #[test]
    fn test_decode_entries_splits_fixed_width() {
        let mut raw = Vec::new();
        for offset in [0u64, 6, 11, 17] {
            write_entry(&mut raw, offset).unwrap();
        }
        assert_eq!(decode_entries(&raw), vec![0, 6, 11, 17]);
        assert!(decode_entries(&raw[..4]).is_empty());
    }
}
