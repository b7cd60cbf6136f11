//! Error types for the scanfill crates.

use thiserror::Error;

/// Result type alias using ScanError.
pub type ScanResult<T> = Result<T, ScanError>;

/// Primary error type for scan-conversion operations.
///
/// The engine has exactly one failure mode: running out of memory while
/// growing an edge pool, cell pool, or bucket array. Degenerate input
/// (horizontal edges, zero-length edges, edges entirely outside the clip,
/// empty clip boxes) is accepted silently and contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("out of memory")]
    OutOfMemory,
}

impl From<std::collections::TryReserveError> for ScanError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ScanError::OutOfMemory
    }
}
