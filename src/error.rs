//! Unified error handling for the kbminer crate
//!
//! Library code returns [`Error`]; the binary wraps it in `anyhow` for
//! context-rich reporting.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use kbminer::error::{Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::utils::error::QueryError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Remote graph query errors (HTTP, endpoint status, decoding)
    Network,
    /// Input parsing errors (NIF groups, section identifiers)
    Parsing,
    /// Document store and I/O errors
    Storage,
    /// Configuration, precondition and API misuse errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the kbminer crate
#[derive(Error, Debug)]
pub enum Error {
    /// A NIF line did not carry the tag expected at its position
    #[error("Malformed NIF group: line {line} has no {field} ({content:?})")]
    MalformedGroup {
        line: usize,
        field: &'static str,
        content: String,
    },

    /// Section identifier is not of the form `<type>_<from>_<to>`
    #[error("Invalid section identifier: '{section_id}'")]
    InvalidSection { section_id: String },

    /// Similarity classification requested for more than two predicates
    #[error("Similarity classification supports at most 2 predicates, got {count}")]
    UnsupportedArity { count: usize },

    /// Graph query failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Document could not be written or read
    #[error("Storage error for '{key}': {reason}")]
    Storage { key: String, reason: String },

    /// Results directory is missing
    #[error("Storage directory not found: {path:?}")]
    StorageDirectoryNotFound { path: PathBuf },

    /// Input dataset is missing
    #[error("Input file not found: {path:?}")]
    InputNotFound { path: PathBuf },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage error
    pub fn storage(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Query(e) => e.is_transient(),
            Self::Io(_) => true,
            Self::MalformedGroup { .. }
            | Self::InvalidSection { .. }
            | Self::UnsupportedArity { .. }
            | Self::Storage { .. }
            | Self::StorageDirectoryNotFound { .. }
            | Self::InputNotFound { .. }
            | Self::Config(_)
            | Self::Json(_)
            | Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Query(_) => ErrorCategory::Network,
            Self::MalformedGroup { .. } | Self::InvalidSection { .. } | Self::Json(_) => {
                ErrorCategory::Parsing
            }
            Self::Storage { .. } | Self::StorageDirectoryNotFound { .. } | Self::Io(_) => {
                ErrorCategory::Storage
            }
            Self::InputNotFound { .. } | Self::Config(_) | Self::UnsupportedArity { .. } => {
                ErrorCategory::Config
            }
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
