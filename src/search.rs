//! Derived stores holding the lines of a source log that match a pattern.
//!
//! A [`SearchView`] is an ordinary text/index pair (see [`crate::format`])
//! whose content is produced by filtering another store's text file
//! through a regular expression. Matching lines keep their bytes and
//! relative order, so the view pages exactly like the log it came from,
//! just denser.
//!
//! Views fill lazily: [`SearchView::update`] scans only the source bytes
//! appended since the previous call, through a fixed-size buffer with a
//! carry-over for lines that straddle buffer boundaries. Calling it after
//! every source append, or only when the view is about to be displayed,
//! are both fine; the result is the same.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;

use memchr::memchr_iter;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::format::{StorePaths, LINE_TERMINATOR};
use crate::page::{PageRequest, Pageable, StoreMetadata};
use crate::store::StoreCore;

/// Compile a line filter: the pattern must cover a whole line, and
/// matching ignores case.
pub(crate) fn compile_filter(pattern: &str) -> Result<Regex> {
    let anchored = format!(r"\A(?:{pattern})\z");
    Ok(RegexBuilder::new(&anchored).case_insensitive(true).build()?)
}

/// A store derived from a line log, holding only the lines that match a
/// regular expression.
///
/// The filter matches against decoded line content: the terminator and an
/// optional carriage return before it are excluded, matching is
/// case-insensitive, and the pattern must cover the whole line. Matching
/// lines are stored with their original bytes, terminator and carriage
/// return included.
///
/// Lines that do not decode as UTF-8 are skipped, counted in
/// [`decode_failures`](SearchView::decode_failures), and logged; a view
/// never fails an update over undecodable source bytes.
///
/// Like its source log, a view serializes its stateful operations on one
/// internal lock and can be shared across threads. It never locks the
/// source store; updates read the source file independently.
#[derive(Debug)]
pub struct SearchView {
    source_text: PathBuf,
    pattern: String,
    filter: Regex,
    paths: StorePaths,
    config: LogConfig,
    inner: Mutex<ViewInner>,
}

#[derive(Debug)]
struct ViewInner {
    core: StoreCore,
    source_scan_position: u64,
    decode_failures: u64,
}

impl SearchView {
    /// Compile `pattern` and create the view's backing pair at `paths`,
    /// truncating any leftovers from an earlier view under the same name.
    ///
    /// Compilation happens first, so a rejected pattern creates nothing.
    pub(crate) fn create(
        source_text: PathBuf,
        paths: StorePaths,
        pattern: &str,
        config: LogConfig,
    ) -> Result<Self> {
        let filter = compile_filter(pattern)?;
        let core = StoreCore::open(&paths, true)?;
        debug!(
            pattern,
            view = %paths.text().display(),
            "created search view"
        );
        Ok(SearchView {
            source_text,
            pattern: pattern.to_string(),
            filter,
            paths,
            config,
            inner: Mutex::new(ViewInner {
                core,
                source_scan_position: 0,
                decode_failures: 0,
            }),
        })
    }

    /// Scan source bytes appended since the last update and absorb the
    /// matching lines.
    ///
    /// Only complete lines are considered; bytes after the source's last
    /// terminator wait for a later call. Source growth during the scan is
    /// also left for the next call, so one update reads a bounded range.
    /// Updating an already caught-up view touches nothing.
    pub fn update(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.core.is_closed() {
            return Err(Error::Closed);
        }

        let source_size = fs::metadata(&self.source_text)?.len();
        if inner.source_scan_position >= source_size {
            return Ok(());
        }

        let mut source = File::open(&self.source_text)?;
        source.seek(SeekFrom::Start(inner.source_scan_position))?;
        let mut source = source.take(source_size - inner.source_scan_position);

        let scanned_from = inner.source_scan_position;
        let mut matched = 0u64;
        let mut buf = vec![0u8; self.config.scan_buffer_size];
        let mut carry: Vec<u8> = Vec::new();
        loop {
            let filled = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            carry.extend_from_slice(&buf[..filled]);
            let consumed = inner.filter_lines(&carry, &self.filter, &mut matched)?;
            carry.drain(..consumed);
        }

        debug!(
            pattern = %self.pattern,
            scanned = inner.source_scan_position - scanned_from,
            matched,
            "search view caught up"
        );
        Ok(())
    }

    /// The pattern this view filters with, as given to
    /// [`LineLog::create_search_view`](crate::LineLog::create_search_view).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Source text offset the next update will scan from.
    pub fn source_scan_position(&self) -> u64 {
        self.inner.lock().source_scan_position
    }

    /// Number of source lines skipped because they were not valid UTF-8.
    pub fn decode_failures(&self) -> u64 {
        self.inner.lock().decode_failures
    }

    /// Read one page of matching lines. See [`Pageable::read_page`].
    pub fn read_page(&self, request: PageRequest) -> Result<Option<Vec<u8>>> {
        self.inner.lock().core.read_page(request)
    }

    /// Snapshot of the view's own counters (sizes of the view pair, not
    /// the source).
    pub fn metadata(&self) -> Result<StoreMetadata> {
        self.inner.lock().core.metadata()
    }

    /// Flush the view pair to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().core.sync()
    }

    /// Check the view pair against the format invariants.
    pub fn verify(&self) -> Result<()> {
        self.inner.lock().core.verify()
    }

    /// Release the view's file handles. Idempotent; the files stay on
    /// disk for the owner to keep or remove.
    pub fn close(&self) {
        self.inner.lock().core.close()
    }

    /// Locations of the view's backing pair.
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }
}

impl ViewInner {
    /// Consume every complete line at the front of `carry`, appending the
    /// matching ones to the view's store. Returns the bytes consumed;
    /// anything after the last terminator stays for the next round.
    fn filter_lines(&mut self, carry: &[u8], filter: &Regex, matched: &mut u64) -> Result<usize> {
        let mut consumed = 0;
        for terminator in memchr_iter(LINE_TERMINATOR, carry) {
            let line = &carry[consumed..=terminator];
            let mut content = &line[..line.len() - 1];
            if content.last() == Some(&b'\r') {
                content = &content[..content.len() - 1];
            }
            match std::str::from_utf8(content) {
                Ok(text) => {
                    if filter.is_match(text) {
                        self.core.append_chunk(line)?;
                        *matched += 1;
                    }
                }
                Err(error) => {
                    self.decode_failures += 1;
                    warn!(
                        offset = self.source_scan_position,
                        %error,
                        "skipping line that does not decode as UTF-8"
                    );
                }
            }
            self.source_scan_position += line.len() as u64;
            consumed = terminator + 1;
        }
        Ok(consumed)
    }
}

impl Pageable for SearchView {
    fn metadata(&self) -> Result<StoreMetadata> {
        SearchView::metadata(self)
    }

    fn read_page(&self, request: PageRequest) -> Result<Option<Vec<u8>>> {
        SearchView::read_page(self, request)
    }

    fn files_in_use(&self) -> Vec<PathBuf> {
        vec![self.paths.text(), self.paths.index()]
    }
}
