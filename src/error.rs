// src/error.rs
//! Error taxonomy shared by the registry client, the storage layer and the
//! correlation engine.

use std::path::PathBuf;

/// Everything that can go wrong while moving or correlating artifacts.
#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    /// The registry did not answer its liveness probe. Fatal to the run.
    #[error("registry unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    /// A byte transfer against a signed URL did not return HTTP 200.
    #[error("transfer {direction} failed with status {status}: {body}")]
    Transfer {
        direction: &'static str,
        status: u16,
        body: String,
    },

    /// The registry confirmation was malformed or did not echo the request.
    #[error("registration of '{relative_path}' rejected: {reason}")]
    Registration {
        relative_path: String,
        reason: String,
    },

    /// A registry endpoint answered with a non-200 status or an unexpected body.
    #[error("registry call {endpoint} failed: {reason}")]
    Registry { endpoint: String, reason: String },

    /// The selected storage mode has no implementation for the operation.
    #[error("{operation} is not supported in {protocol} storage mode")]
    Unsupported {
        operation: &'static str,
        protocol: String,
    },

    /// A detection file name does not follow the capture date convention.
    #[error("cannot parse capture date from '{file_name}': {reason}")]
    DateParse { file_name: String, reason: String },

    /// A row-indexed table could not be read into records.
    #[error("invalid table {}: {reason}", path.display())]
    InvalidTable { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = AugmentError> = std::result::Result<T, E>;

impl AugmentError {
    /// Short, stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AugmentError::Unavailable { .. } => "unavailable",
            AugmentError::Transfer { .. } => "transfer",
            AugmentError::Registration { .. } => "registration",
            AugmentError::Registry { .. } => "registry",
            AugmentError::Unsupported { .. } => "unsupported",
            AugmentError::DateParse { .. } => "date_parse",
            AugmentError::InvalidTable { .. } => "invalid_table",
            AugmentError::Io(_) => "io",
            AugmentError::Json(_) => "json",
            AugmentError::Http(_) => "http",
        }
    }
}

/// Correlation needs one detection set and at least one social-post set.
/// Returned as a value in the run report; never propagated with `?`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[error(
    "insufficient source coverage (detections: {detections}, twitter: {twitter}, telegram: {telegram}); run the sentinel and at least one social pipeline first"
)]
pub struct CoverageGateError {
    pub detections: bool,
    pub twitter: bool,
    pub telegram: bool,
}
