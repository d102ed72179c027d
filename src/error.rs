//! Error types for the page cache.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: returned when a cache configuration is rejected at
//!   construction (zero page size or count, oversized pages, arena overflow).
//! - [`PageCacheError`]: why a single cached read stopped early.
//! - [`ReadError`]: a [`PageCacheError`] plus the number of bytes that were
//!   copied into the caller's buffer before it happened. Those bytes are
//!   valid.
//!
//! End of input is not an error: a read at or past the logical size returns
//! `Ok(0)`.
//!
//! ## Example Usage
//!
//! ```
//! use pagecache::builder::PageCacheBuilder;
//!
//! let bad = PageCacheBuilder::new().page_count(0).build();
//! assert!(bad.unwrap_err().to_string().contains("page count"));
//! ```

use std::fmt;
use std::io;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// PageCacheError
// ---------------------------------------------------------------------------

/// Reason a cached read could not be completed.
#[derive(Debug)]
pub enum PageCacheError {
    /// The read started at a negative offset, or addresses a page index that
    /// does not fit the cache key.
    OffsetOutOfRange { offset: i64, size: i64 },
    /// The owning bucket had neither a free slot nor an entry to evict.
    NoFreePages,
    /// The backing source returned a short page that does not end at the
    /// reader's logical size.
    NoProgress {
        offset: u64,
        expected: usize,
        read: usize,
    },
    /// The backing source failed.
    Io(io::Error),
}

impl fmt::Display for PageCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCacheError::OffsetOutOfRange { offset, size } => {
                write!(f, "offset out of range: {offset}/{size}")
            },
            PageCacheError::NoFreePages => f.write_str("there are no free pages left in the cache"),
            PageCacheError::NoProgress {
                offset,
                expected,
                read,
            } => write!(
                f,
                "backing source made no progress at offset {offset}: read {read} of {expected} bytes"
            ),
            PageCacheError::Io(err) => write!(f, "backing source error: {err}"),
        }
    }
}

impl std::error::Error for PageCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageCacheError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PageCacheError {
    fn from(err: io::Error) -> Self {
        PageCacheError::Io(err)
    }
}

impl From<PageCacheError> for io::Error {
    fn from(err: PageCacheError) -> Self {
        match err {
            PageCacheError::Io(err) => err,
            PageCacheError::OffsetOutOfRange { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            },
            PageCacheError::NoFreePages => io::Error::new(io::ErrorKind::OutOfMemory, err),
            PageCacheError::NoProgress { .. } => io::Error::other(err),
        }
    }
}

// ---------------------------------------------------------------------------
// ReadError
// ---------------------------------------------------------------------------

/// A failed cached read together with its partial progress.
#[derive(Debug)]
pub struct ReadError {
    copied: usize,
    error: PageCacheError,
}

impl ReadError {
    #[inline]
    pub fn new(copied: usize, error: PageCacheError) -> Self {
        Self { copied, error }
    }

    /// Bytes written to the front of the destination before the failure.
    #[inline]
    pub fn copied(&self) -> usize {
        self.copied
    }

    #[inline]
    pub fn error(&self) -> &PageCacheError {
        &self.error
    }

    #[inline]
    pub fn into_error(self) -> PageCacheError {
        self.error
    }

    /// Returns `true` for the recoverable shard-exhaustion condition.
    #[inline]
    pub fn is_no_free_pages(&self) -> bool {
        matches!(self.error, PageCacheError::NoFreePages)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} bytes)", self.error, self.copied)
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        err.error.into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
