//! redline-check: the HTTP boundary to the external checking service.
//!
//! The service itself is a black box; only its request/response contracts
//! matter here. This crate builds check requests from annotated text,
//! parses the stream-relative results, and translates them into
//! source-relative [`Match`] values via the annotation's segment table.

pub mod client;
pub mod types;

pub use client::{CheckerClient, Credentials};
pub use types::{Category, CheckOptions, CheckResponse, Match, RawMatch, Replacement, Rule};

/// Errors from the checker boundary.
///
/// Transport failures are recoverable at the orchestrator: logged, surfaced
/// as a notice, no decorations modified, no automatic retry.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("checker endpoint is not a valid url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("checker returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed checker response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dictionary endpoints require account credentials")]
    MissingCredentials,
}
