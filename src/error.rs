//! Error types for pagelog operations.
//!
//! All fallible operations in this crate return [`Result`], with [`Error`]
//! covering I/O failures, rejected page requests, pattern compilation
//! failures, and format violations detected in backing files.

use thiserror::Error;

use crate::config::LogConfigError;
use crate::page::MIN_ITEMS_PER_PAGE;

/// Result type alias for pagelog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by stores and their derived views.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page numbers are 1-based; zero is rejected before any I/O happens.
    #[error("Page number must be at least 1, got {page}")]
    PageOutOfRange {
        /// The rejected page number.
        page: u64,
    },

    /// Page size below the floor that keeps per-request I/O proportional.
    #[error("Page size must be at least {min} lines, got {items_per_page}", min = MIN_ITEMS_PER_PAGE)]
    PageSizeTooSmall {
        /// The rejected page size.
        items_per_page: u64,
    },

    /// The search pattern did not compile. No view files are created when
    /// this is returned.
    #[error("Search pattern rejected: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(#[from] LogConfigError),

    /// The store's file handles were released by `close`; only a fresh
    /// `open` can revive the data.
    #[error("Store has been closed")]
    Closed,

    /// A backing file violates the on-disk format (misaligned index,
    /// non-zero sentinel, index pointing past the end of the text).
    #[error("Store corruption detected: {0}")]
    Corruption(String),
}
