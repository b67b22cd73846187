//! Error types for the core engine.
//!
//! Only data-integrity, configuration and storage problems are errors.
//! Invalid player input is reported through [`crate::Rejection`] and terminal
//! game states are ordinary turn outcomes.

use thiserror::Error;

/// Top-level error type for all engine operations.
#[derive(Error, Debug)]
pub enum LineError {
    /// The world or event catalog definition is malformed or inconsistent.
    #[error("Catalog integrity error: {0}")]
    Catalog(String),

    /// A location id was referenced that does not exist in the world.
    #[error("Unknown location: {0}")]
    UnknownLocation(crate::LocationId),

    /// Configuration could not be parsed or is out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A save snapshot was written by an incompatible schema version.
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    SnapshotVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, LineError>;
