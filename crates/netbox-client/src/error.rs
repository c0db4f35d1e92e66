//! NetBox client errors
//!
//! The operator writes these messages verbatim into resource statuses, so
//! they name the object kind and the query that failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetBoxError {
    /// Transport failure before NetBox answered
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response, or a failure injected by the mock
    #[error("NetBox API error: {0}")]
    Api(String),

    #[error("unable to decode NetBox response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 401 or 403: the token from the credentials file was rejected
    #[error("NetBox rejected the API token: {0}")]
    Authentication(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A lookup expected to be unique matched several objects
    #[error("unexpected number of {kind} found ({count}) for {query}")]
    MultipleResults {
        kind: &'static str,
        query: String,
        count: usize,
    },

    /// Rejected before sending, e.g. an empty URL
    #[error("invalid NetBox request: {0}")]
    InvalidRequest(String),
}
