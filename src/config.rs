//! Store configuration.

use thiserror::Error;

/// Default size of the streaming scan buffer (1MB).
pub const DEFAULT_SCAN_BUFFER_SIZE: usize = 1024 * 1024;

/// Configuration shared by a line log and the search views derived from it.
///
/// # Examples
///
/// ```
/// use pagelog::LogConfig;
///
/// let config = LogConfig::new().with_scan_buffer_size(256 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Buffer size in bytes for streaming scans (default 1MB).
    ///
    /// `SearchView::update` and `LineLog::append_from` move bytes through a
    /// buffer of this size. Lines longer than the buffer still work; they
    /// accumulate in a carry-over allocation until their terminator arrives.
    pub scan_buffer_size: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            scan_buffer_size: DEFAULT_SCAN_BUFFER_SIZE,
        }
    }
}

impl LogConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the streaming scan buffer size in bytes.
    pub fn with_scan_buffer_size(mut self, bytes: usize) -> Self {
        self.scan_buffer_size = bytes;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), LogConfigError> {
        if self.scan_buffer_size == 0 {
            return Err(LogConfigError::ZeroScanBuffer);
        }
        Ok(())
    }

    /// Configuration for tests: a buffer small enough that ordinary fixture
    /// lines straddle buffer boundaries and exercise the carry-over path.
    pub fn for_testing() -> Self {
        LogConfig {
            scan_buffer_size: 64,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogConfigError {
    /// The scan buffer must hold at least one byte.
    #[error("Scan buffer size must be nonzero")]
    ZeroScanBuffer,
}
