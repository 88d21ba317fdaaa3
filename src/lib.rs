//! Line-indexed append-only text storage with paged views.
//!
//! A [`LineLog`] is a pair of files that grow together: raw text in
//! `<base>.log` and, for every line terminator appended, an 8-byte offset
//! in `<base>.idx`. The index turns "page 7, 50 lines, newest first" into
//! a couple of bounded file reads, no matter how large the log has grown.
//! A [`SearchView`] is a derived store holding only the lines that match a
//! regular expression, indexed the same way and caught up incrementally as
//! its source grows.
//!
//! The crate fits workloads that tail and page large growing line files
//! interactively: crawler fetch logs, build output, audit trails.
//!
//! # Example
//!
//! ```no_run
//! use pagelog::{LineLog, LogConfig, PageRequest};
//!
//! fn main() -> pagelog::Result<()> {
//!     let log = LineLog::open("/var/data", "events", LogConfig::default())?;
//!     log.append(b"alpha\nbeta\ngamma\ndelta\n")?;
//!
//!     // Page 1, newest first: "delta\ngamma\nbeta\nalpha\n".
//!     let newest = log.read_page(PageRequest::backward(1, 25)?)?;
//!
//!     // A view of the lines matching "b.*", paged the same way.
//!     let bees = log.create_search_view("b.*")?;
//!     bees.update()?;
//!     let matching = bees.read_page(PageRequest::forward(1, 25)?)?;
//!     # let _ = (newest, matching);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config; // Store configuration
pub mod error; // Error types and Result alias
pub mod format; // On-disk pair layout and entry codec
pub mod page; // Page requests, metadata, the shared pager
pub mod prefix; // Query prefix comparison
pub mod search; // Regex-filtered derived stores
pub mod store; // LineLog and the file-pair core

// Re-export the main types at the crate root
pub use config::{LogConfig, LogConfigError, DEFAULT_SCAN_BUFFER_SIZE};
pub use error::{Error, Result};
pub use format::{StorePaths, ENTRY_SIZE, INDEX_EXTENSION, TEXT_EXTENSION};
pub use page::{PageRequest, Pageable, StoreMetadata, MIN_ITEMS_PER_PAGE};
pub use prefix::compare_prefix;
pub use search::SearchView;
pub use store::LineLog;
