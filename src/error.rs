//! Engine error types
//!
//! Unified error handling for the tree-storage, addressing and cache
//! subsystems. Structural corruption of persisted data is deliberately *not*
//! represented here: a bad magic or CRC reads as "no usable cache" and is
//! reported through `Option`/sentinel returns, never as an error that could
//! bubble up as a crash.

use thiserror::Error;

/// Unified engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache error (directory setup, index write, budget enforcement)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Cache writes failed; caching is disabled for this session
    #[error("Caching disabled: {0}")]
    CachingDisabled(String),

    /// Serialization buffer entered the error state
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document structure violated an invariant (bad child index, orphan node)
    #[error("Document structure error: {0}")]
    Structure(String),

    /// A swapped node could not be reloaded from the cache
    #[error("Swap-in failed for arena part {0}")]
    SwapIn(u32),

    /// Operation cancelled by the caller's keep-going check
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
