//! The primary append-only store and the file-pair core it shares with
//! derived views.
//!
//! A [`LineLog`] owns a text/index pair (see [`crate::format`]) and keeps
//! three counters in memory: total text size, number of indexed lines, and
//! the offset just past the newest indexed terminator. Appends write the
//! text first and the index entries second, so a crash between the two
//! leaves recorded bytes without entries, never entries without bytes.
//!
//! All stateful operations on one store serialize on a single lock per
//! store instance. Distinct stores, including views derived from the same
//! log, never contend with each other.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use memchr::memchr_iter;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::format::{self, StorePaths, ENTRY_SIZE, LINE_TERMINATOR};
use crate::page::{self, PageRequest, Pageable, StoreMetadata};
use crate::search::SearchView;

/// Open file pair plus counters, shared by [`LineLog`] and
/// [`SearchView`]. Callers hold it behind their per-store lock.
#[derive(Debug)]
pub(crate) struct StoreCore {
    files: Option<BackingFiles>,
    text_size: u64,
    line_count: u64,
    last_indexed_position: u64,
}

#[derive(Debug)]
struct BackingFiles {
    text: File,
    index: File,
}

impl StoreCore {
    /// Open or create the pair at `paths`. With `truncate` set, previous
    /// contents are discarded first; derived views never reuse results
    /// computed for an earlier pattern.
    ///
    /// A fresh or truncated index receives the zero sentinel entry. A
    /// non-empty one restores the counters from its length and newest
    /// entry; a torn trailing entry from an interrupted write is dropped.
    pub(crate) fn open(paths: &StorePaths, truncate: bool) -> Result<StoreCore> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        if truncate {
            options.truncate(true);
        }
        let mut text = options.open(paths.text())?;
        let mut index = options.open(paths.index())?;

        let text_size = text.seek(SeekFrom::End(0))?;
        let mut index_size = index.seek(SeekFrom::End(0))?;

        let torn = index_size % ENTRY_SIZE;
        if torn != 0 {
            warn!(
                index = %paths.index().display(),
                index_size,
                "dropping torn index tail"
            );
            index_size -= torn;
            index.set_len(index_size)?;
        }

        let (line_count, last_indexed_position) = if index_size == 0 {
            index.seek(SeekFrom::Start(0))?;
            format::write_entry(&mut index, 0)?;
            (0, 0)
        } else {
            let entries = index_size / ENTRY_SIZE;
            let newest = format::read_entry(&mut index, entries - 1)?;
            (entries - 1, newest)
        };

        Ok(StoreCore {
            files: Some(BackingFiles { text, index }),
            text_size,
            line_count,
            last_indexed_position,
        })
    }

    /// Append `bytes` to the text file and index every line terminator the
    /// chunk contains. Returns the new total text size.
    ///
    /// Entries for one chunk are written in a single batch, so the index
    /// grows by whole entries even if the process dies mid-call.
    pub(crate) fn append_chunk(&mut self, bytes: &[u8]) -> Result<u64> {
        let files = self.files.as_mut().ok_or(Error::Closed)?;
        let base = self.text_size;

        let mut entries = Vec::new();
        let mut newest = self.last_indexed_position;
        let mut found = 0u64;
        for terminator in memchr_iter(LINE_TERMINATOR, bytes) {
            newest = base + terminator as u64 + 1;
            format::write_entry(&mut entries, newest)?;
            found += 1;
        }

        files.text.seek(SeekFrom::End(0))?;
        files.text.write_all(bytes)?;
        if !entries.is_empty() {
            files.index.seek(SeekFrom::End(0))?;
            files.index.write_all(&entries)?;
        }

        self.text_size = base + bytes.len() as u64;
        self.line_count += found;
        self.last_indexed_position = newest;
        Ok(self.text_size)
    }

    pub(crate) fn read_page(&mut self, request: PageRequest) -> Result<Option<Vec<u8>>> {
        let line_count = self.line_count;
        let files = self.files.as_mut().ok_or(Error::Closed)?;
        page::read_page_window(&mut files.index, &mut files.text, line_count, request)
    }

    pub(crate) fn metadata(&self) -> Result<StoreMetadata> {
        if self.files.is_none() {
            return Err(Error::Closed);
        }
        Ok(StoreMetadata {
            text_size: self.text_size,
            index_size: (self.line_count + 1) * ENTRY_SIZE,
            last_indexed_position: self.last_indexed_position,
            line_count: self.line_count,
        })
    }

    pub(crate) fn sync(&self) -> Result<()> {
        let files = self.files.as_ref().ok_or(Error::Closed)?;
        files.text.sync_all()?;
        files.index.sync_all()?;
        Ok(())
    }

    /// Check the on-disk pair against the format invariants and the
    /// in-memory counters.
    pub(crate) fn verify(&mut self) -> Result<()> {
        let recorded_text_size = self.text_size;
        let recorded_lines = self.line_count;
        let files = self.files.as_mut().ok_or(Error::Closed)?;

        let text_size = files.text.seek(SeekFrom::End(0))?;
        let index_size = files.index.seek(SeekFrom::End(0))?;

        if index_size % ENTRY_SIZE != 0 {
            return Err(Error::Corruption(format!(
                "index length {index_size} is not a multiple of {ENTRY_SIZE}"
            )));
        }
        if index_size < ENTRY_SIZE {
            return Err(Error::Corruption(
                "index file lost its sentinel entry".to_string(),
            ));
        }
        let sentinel = format::read_entry(&mut files.index, 0)?;
        if sentinel != 0 {
            return Err(Error::Corruption(format!(
                "sentinel entry holds {sentinel}, expected 0"
            )));
        }
        let entries = index_size / ENTRY_SIZE;
        let newest = format::read_entry(&mut files.index, entries - 1)?;
        if newest > text_size {
            return Err(Error::Corruption(format!(
                "newest index entry {newest} points past the text size {text_size}"
            )));
        }
        if text_size != recorded_text_size || entries - 1 != recorded_lines {
            return Err(Error::Corruption(format!(
                "files changed underneath the store: text {text_size} vs {recorded_text_size} \
                 recorded, {} lines vs {recorded_lines} recorded",
                entries - 1
            )));
        }
        Ok(())
    }

    /// Release the file handles and reset the counters. Idempotent; flush
    /// failures are dropped, closing never fails.
    pub(crate) fn close(&mut self) {
        if let Some(files) = self.files.take() {
            let _ = files.text.sync_all();
            let _ = files.index.sync_all();
        }
        self.text_size = 0;
        self.line_count = 0;
        self.last_indexed_position = 0;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.files.is_none()
    }

    pub(crate) fn text_size(&self) -> u64 {
        self.text_size
    }

    pub(crate) fn line_count(&self) -> u64 {
        self.line_count
    }
}

/// A line-indexed append-only text store.
///
/// Appended bytes land in `<base>.log`; every line terminator extends
/// `<base>.idx` with the offset just past it. The index makes any page of
/// lines addressable in O(page) I/O, oldest first or newest first, without
/// scanning the text. [`create_search_view`](LineLog::create_search_view)
/// derives a store holding only the lines matching a regular expression,
/// pageable the same way.
///
/// A `LineLog` can be shared across threads as-is; every stateful
/// operation takes the store's internal lock.
///
/// # Examples
///
/// ```no_run
/// use pagelog::{LineLog, LogConfig, PageRequest};
///
/// fn main() -> pagelog::Result<()> {
///     let log = LineLog::open("/var/data/crawler", "fetches", LogConfig::default())?;
///     log.append(b"fetched https://example.org/ in 120ms\n")?;
///
///     // Newest lines first, 25 per page.
///     if let Some(page) = log.read_page(PageRequest::backward(1, 25)?)? {
///         print!("{}", String::from_utf8_lossy(&page));
///     }
///     Ok(())
/// }
/// ```
pub struct LineLog {
    paths: StorePaths,
    config: LogConfig,
    view_seq: AtomicU64,
    inner: Mutex<StoreCore>,
}

impl LineLog {
    /// Open the store `<dir>/<base>.log` + `<dir>/<base>.idx`, creating an
    /// empty pair if none exists.
    ///
    /// Reopening an existing pair restores the counters from the files, so
    /// appends continue where the previous process stopped.
    pub fn open(dir: impl AsRef<Path>, base: &str, config: LogConfig) -> Result<Self> {
        config.validate()?;
        let paths = StorePaths::new(dir.as_ref(), base);
        let core = StoreCore::open(&paths, false)?;
        debug!(
            text = %paths.text().display(),
            lines = core.line_count(),
            "opened line log"
        );
        Ok(LineLog {
            paths,
            config,
            view_seq: AtomicU64::new(0),
            inner: Mutex::new(core),
        })
    }

    /// Append raw bytes and index every complete line they close.
    ///
    /// Bytes after the last terminator stay unindexed until a later append
    /// delivers one; how the input is chunked never changes the resulting
    /// index. Returns the new total text size.
    pub fn append(&self, bytes: &[u8]) -> Result<u64> {
        self.inner.lock().append_chunk(bytes)
    }

    /// Stream a reader to the end of the store through the configured scan
    /// buffer. Returns the new total text size.
    pub fn append_from<R: Read>(&self, mut reader: R) -> Result<u64> {
        let mut inner = self.inner.lock();
        if inner.is_closed() {
            return Err(Error::Closed);
        }
        let mut buf = vec![0u8; self.config.scan_buffer_size];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    inner.append_chunk(&buf[..n])?;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(inner.text_size())
    }

    /// Read one page of lines. See [`Pageable::read_page`].
    pub fn read_page(&self, request: PageRequest) -> Result<Option<Vec<u8>>> {
        self.inner.lock().read_page(request)
    }

    /// Snapshot of the store's counters.
    pub fn metadata(&self) -> Result<StoreMetadata> {
        self.inner.lock().metadata()
    }

    /// Derive a view holding only the lines that match `pattern`.
    ///
    /// The pattern must match a whole line (case-insensitively) for the
    /// line to qualify. It is compiled before anything touches disk; a
    /// rejected pattern therefore leaves no files behind. The view starts
    /// empty and catches up on [`SearchView::update`].
    ///
    /// Each view derived from this log gets a fresh numbered file pair
    /// (`<base>-1`, `<base>-2`, ...), so views are independent stores.
    pub fn create_search_view(&self, pattern: &str) -> Result<SearchView> {
        if self.inner.lock().is_closed() {
            return Err(Error::Closed);
        }
        let seq = self.view_seq.fetch_add(1, Ordering::Relaxed) + 1;
        SearchView::create(self.paths.text(), self.paths.view(seq), pattern, self.config)
    }

    /// Flush both backing files to stable storage.
    ///
    /// Appends themselves rely on OS write-back caching; durability points
    /// are the caller's decision.
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().sync()
    }

    /// Check the backing pair against the format invariants.
    pub fn verify(&self) -> Result<()> {
        self.inner.lock().verify()
    }

    /// Release the file handles and reset the counters. Subsequent
    /// stateful operations return [`Error::Closed`]; the data stays on
    /// disk for a later [`open`](LineLog::open). Idempotent.
    pub fn close(&self) {
        self.inner.lock().close()
    }

    /// Total bytes appended so far (zero after `close`).
    pub fn text_size(&self) -> u64 {
        self.inner.lock().text_size()
    }

    /// Number of fully indexed lines (zero after `close`).
    pub fn line_count(&self) -> u64 {
        self.inner.lock().line_count()
    }

    /// Locations of the backing pair.
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }
}

impl Pageable for LineLog {
    fn metadata(&self) -> Result<StoreMetadata> {
        LineLog::metadata(self)
    }

    fn read_page(&self, request: PageRequest) -> Result<Option<Vec<u8>>> {
        LineLog::read_page(self, request)
    }

    fn files_in_use(&self) -> Vec<PathBuf> {
        vec![self.paths.text(), self.paths.index()]
    }
}
