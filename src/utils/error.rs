//! Error types for the graph query layer
//!
//! This module defines the failure modes of remote SPARQL requests.

use thiserror::Error;

/// Errors that can occur while executing a graph query
#[derive(Error, Debug)]
pub enum QueryError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a server error status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Endpoint rejected the query
    #[error("Query rejected with status {status}: {body}")]
    BadRequest { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// A solution is missing a variable the query projects
    #[error("Missing binding '{0}' in query solution")]
    MissingBinding(String),

    /// Maximum retry attempts exceeded
    #[error("Query failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<QueryError>,
    },
}

impl QueryError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_redirect(),
            Self::ServerError(_) => true,
            Self::Decode(_) => true,
            Self::BadRequest { status, .. } => *status == 429,
            Self::MissingBinding(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}
