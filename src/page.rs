//! Page requests and the shared paging algorithm.
//!
//! The line log and its search views serve pages the same way: the offset
//! index turns a page number into a byte range, so a page read costs two
//! aligned entry reads (forward) or one sequential index-window read plus
//! one contiguous text read (backward). Cost is proportional to the page,
//! never to the store.
//!
//! Backward pages count from the newest line: descending page 1 holds the
//! newest `items_per_page` lines, newest first. Bytes inside a line keep
//! their natural order; only whole lines are reversed, in memory, after a
//! single forward read of the page's window.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::{self, ENTRY_SIZE};

/// Smallest page size a request may carry.
///
/// Tiny pages would make paging cost dominated by request overhead instead
/// of the lines themselves, so anything below this floor is rejected before
/// any file is touched.
pub const MIN_ITEMS_PER_PAGE: u64 = 25;

/// A validated request for one page of lines.
///
/// Construction enforces the floors on page number and page size, so a
/// `PageRequest` that exists is always servable and the pager never
/// re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    items_per_page: u64,
    descending: bool,
}

impl PageRequest {
    /// Create a request for 1-based `page` holding up to `items_per_page`
    /// lines, counted from the newest line when `descending` is set.
    pub fn new(page: u64, items_per_page: u64, descending: bool) -> Result<Self> {
        if page < 1 {
            return Err(Error::PageOutOfRange { page });
        }
        if items_per_page < MIN_ITEMS_PER_PAGE {
            return Err(Error::PageSizeTooSmall { items_per_page });
        }
        Ok(PageRequest {
            page,
            items_per_page,
            descending,
        })
    }

    /// Page counted from the start of the store, oldest line first.
    pub fn forward(page: u64, items_per_page: u64) -> Result<Self> {
        Self::new(page, items_per_page, false)
    }

    /// Page counted back from the end of the store, newest line first.
    pub fn backward(page: u64, items_per_page: u64) -> Result<Self> {
        Self::new(page, items_per_page, true)
    }

    /// The 1-based page number.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Upper bound on lines in the returned page.
    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    /// Whether lines are returned newest first.
    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

/// Size and progress counters for one store, captured under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Total bytes in the text file, unterminated tail included.
    pub text_size: u64,
    /// Total bytes in the index file, always `(line_count + 1) * 8`.
    pub index_size: u64,
    /// Text offset immediately after the newest indexed terminator.
    pub last_indexed_position: u64,
    /// Number of fully indexed lines.
    pub line_count: u64,
}

/// Paged read access over a line-indexed store.
///
/// Implemented by both [`LineLog`](crate::LineLog) and
/// [`SearchView`](crate::SearchView), so a raw log and a filtered view page
/// through the same interface.
pub trait Pageable {
    /// Snapshot of the store's counters.
    fn metadata(&self) -> Result<StoreMetadata>;

    /// Read one page of lines as raw bytes, terminators included.
    ///
    /// Returns `Ok(None)` when the request lies entirely past the data.
    fn read_page(&self, request: PageRequest) -> Result<Option<Vec<u8>>>;

    /// Paths of the backing files, for callers that track disk usage.
    fn files_in_use(&self) -> Vec<PathBuf>;
}

/// Serve one page from an open file pair holding `line_count` indexed lines.
pub(crate) fn read_page_window<I, T>(
    index: &mut I,
    text: &mut T,
    line_count: u64,
    request: PageRequest,
) -> Result<Option<Vec<u8>>>
where
    I: Read + Seek,
    T: Read + Seek,
{
    let page = request.page();
    let items = request.items_per_page();
    if request.is_descending() {
        read_backward(index, text, line_count, page, items)
    } else {
        read_forward(index, text, line_count, page, items)
    }
}

fn read_forward<I, T>(
    index: &mut I,
    text: &mut T,
    line_count: u64,
    page: u64,
    items: u64,
) -> Result<Option<Vec<u8>>>
where
    I: Read + Seek,
    T: Read + Seek,
{
    let first = (page - 1).saturating_mul(items);
    if first >= line_count {
        return Ok(None);
    }
    let last = line_count.min(first.saturating_add(items));

    let from = format::read_entry(index, first)?;
    let to = format::read_entry(index, last)?;
    let mut lines = vec![0u8; entry_span(from, to)?];
    text.seek(SeekFrom::Start(from))?;
    text.read_exact(&mut lines)?;
    Ok(Some(lines))
}

fn read_backward<I, T>(
    index: &mut I,
    text: &mut T,
    line_count: u64,
    page: u64,
    items: u64,
) -> Result<Option<Vec<u8>>>
where
    I: Read + Seek,
    T: Read + Seek,
{
    let skipped = (page - 1).saturating_mul(items);
    if skipped >= line_count {
        return Ok(None);
    }
    // Lines [first, last) make up this page. The final page clamps at the
    // front instead of shifting, so short stores never repeat lines.
    let last = line_count - skipped;
    let first = last.saturating_sub(items);

    // Phase one: every entry bounding the page, in one sequential read.
    let entry_count = (last - first + 1) as usize;
    let mut raw = vec![0u8; entry_count * ENTRY_SIZE as usize];
    index.seek(SeekFrom::Start(first.saturating_mul(ENTRY_SIZE)))?;
    index.read_exact(&mut raw)?;
    let offsets = format::decode_entries(&raw);

    // Phase two: the page's text window, contiguous on disk.
    let base = offsets[0];
    let span = entry_span(base, offsets[entry_count - 1])?;
    let mut window = vec![0u8; span];
    text.seek(SeekFrom::Start(base))?;
    text.read_exact(&mut window)?;

    // Walk the offsets oldest to newest while filling the output from its
    // end. Line order reverses; bytes within each line stay forward.
    let mut lines = vec![0u8; span];
    let mut write_at = span;
    for pair in offsets.windows(2) {
        let from = entry_span(base, pair[0])?;
        let to = entry_span(base, pair[1])?;
        let line = window.get(from..to).ok_or_else(|| {
            Error::Corruption(format!(
                "index entry {} outside its page window of {span} bytes",
                pair[1]
            ))
        })?;
        write_at -= line.len();
        lines[write_at..write_at + line.len()].copy_from_slice(line);
    }
    Ok(Some(lines))
}

/// Byte distance between two index entries, rejecting out-of-order pairs.
fn entry_span(from: u64, to: u64) -> Result<usize> {
    match to.checked_sub(from) {
        Some(span) => Ok(span as usize),
        None => Err(Error::Corruption(format!(
            "index entries out of order: {from} followed by {to}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Four short lines, the smallest fixture where reversal is visible.
    fn small_fixture() -> (Cursor<Vec<u8>>, Cursor<Vec<u8>>) {
        build_fixture(&["alpha", "beta", "gamma", "delta"])
    }

    fn build_fixture(lines: &[&str]) -> (Cursor<Vec<u8>>, Cursor<Vec<u8>>) {
        let mut text = Vec::new();
        let mut index = Vec::new();
        format::write_entry(&mut index, 0).unwrap();
        for line in lines {
            text.extend_from_slice(line.as_bytes());
            text.push(b'\n');
            format::write_entry(&mut index, text.len() as u64).unwrap();
        }
        (Cursor::new(index), Cursor::new(text))
    }

    fn page(
        index: &mut Cursor<Vec<u8>>,
        text: &mut Cursor<Vec<u8>>,
        line_count: u64,
        request: PageRequest,
    ) -> Option<String> {
        read_page_window(index, text, line_count, request)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_forward_page_returns_lines_in_order() {
        let (mut index, mut text) = small_fixture();
        let got = page(&mut index, &mut text, 4, PageRequest::forward(1, 25).unwrap());
        assert_eq!(got.as_deref(), Some("alpha\nbeta\ngamma\ndelta\n"));
    }

    #[test]
    fn test_backward_page_reverses_line_order() {
        let (mut index, mut text) = small_fixture();
        let got = page(&mut index, &mut text, 4, PageRequest::backward(1, 25).unwrap());
        assert_eq!(got.as_deref(), Some("delta\ngamma\nbeta\nalpha\n"));
    }

    #[test]
    fn test_pages_past_the_data_are_none() {
        let (mut index, mut text) = small_fixture();
        for descending in [false, true] {
            for page_nr in [2, 3, u64::MAX] {
                let request = PageRequest::new(page_nr, 25, descending).unwrap();
                assert_eq!(page(&mut index, &mut text, 4, request), None);
            }
        }
    }

    #[test]
    fn test_empty_store_has_no_pages() {
        let (mut index, mut text) = build_fixture(&[]);
        for descending in [false, true] {
            let request = PageRequest::new(1, 25, descending).unwrap();
            assert_eq!(page(&mut index, &mut text, 0, request), None);
        }
    }

    #[test]
    fn test_second_backward_page_clamps_at_the_front() {
        let lines: Vec<String> = (0..30).map(|i| format!("line-{i:02}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut index, mut text) = build_fixture(&refs);

        // Page 1 newest first: lines 29 down to 5.
        let newest: String = (5..30).rev().map(|i| format!("line-{i:02}\n")).collect();
        let got = page(&mut index, &mut text, 30, PageRequest::backward(1, 25).unwrap());
        assert_eq!(got.as_deref(), Some(newest.as_str()));

        // Page 2 clamps to the remaining five oldest lines.
        let oldest: String = (0..5).rev().map(|i| format!("line-{i:02}\n")).collect();
        let got = page(&mut index, &mut text, 30, PageRequest::backward(2, 25).unwrap());
        assert_eq!(got.as_deref(), Some(oldest.as_str()));

        // Forward slicing of the same store for comparison.
        let tail: String = (25..30).map(|i| format!("line-{i:02}\n")).collect();
        let got = page(&mut index, &mut text, 30, PageRequest::forward(2, 25).unwrap());
        assert_eq!(got.as_deref(), Some(tail.as_str()));
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            PageRequest::forward(0, 25),
            Err(Error::PageOutOfRange { page: 0 })
        ));
        assert!(matches!(
            PageRequest::forward(1, 24),
            Err(Error::PageSizeTooSmall { items_per_page: 24 })
        ));

        let request = PageRequest::backward(2, 25).unwrap();
        assert_eq!(request.page(), 2);
        assert_eq!(request.items_per_page(), 25);
        assert!(request.is_descending());
        assert!(!PageRequest::forward(1, 25).unwrap().is_descending());
    }

    #[test]
    fn test_out_of_order_entries_reported_as_corruption() {
        // Sentinel claims offset 10, first line ends at 5.
        let mut index = Vec::new();
        format::write_entry(&mut index, 10).unwrap();
        format::write_entry(&mut index, 5).unwrap();
        let mut index = Cursor::new(index);
        let mut text = Cursor::new(b"abcde\n".to_vec());

        let request = PageRequest::forward(1, 25).unwrap();
        let err = read_page_window(&mut index, &mut text, 1, request).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));

        let request = PageRequest::backward(1, 25).unwrap();
        let err = read_page_window(&mut index, &mut text, 1, request).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let metadata = StoreMetadata {
            text_size: 23,
            index_size: 40,
            last_indexed_position: 23,
            line_count: 4,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(
            serde_json::from_str::<StoreMetadata>(&json).unwrap(),
            metadata
        );
    }
}
