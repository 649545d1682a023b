//! Error types for the Roads API client.
//!
//! # Design
//! Every failure an operation can hit maps to exactly one variant and is
//! handed back to the caller as produced. Validation variants fire before any
//! network activity; `Auth`, `Transport` and `Decode` carry whatever the
//! collaborator reported; `Canceled` and `DeadlineExceeded` mirror the
//! [`CancelReason`](crate::cancel::CancelReason) of the caller's context.

use thiserror::Error;

/// Boxed error produced by an [`HttpTransport`](crate::http::HttpTransport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `RoadsClient` operations.
#[derive(Debug, Error)]
pub enum RoadsError {
    /// A snap-to-road request carried no points.
    #[error("snapToRoad: You must specify a Path")]
    EmptyPath,

    /// A speed-limits request carried neither points nor place IDs.
    #[error("speedLimits: You must specify a Path or PlaceID")]
    MissingPathOrPlaceId,

    /// A `"lat,lng"` string could not be parsed.
    #[error("invalid lat,lng pair: {0:?}")]
    InvalidLatLng(String),

    /// The configured base URL and endpoint path do not form a valid URL.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// The signing collaborator refused to produce a query string.
    #[error("auth: {0}")]
    Auth(String),

    /// The HTTP round-trip itself failed.
    #[error("transport: {0}")]
    Transport(#[source] TransportError),

    /// The response body was not the expected JSON shape.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered with its JSON error envelope.
    #[error("roads API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered with a non-2xx status and an unrecognised body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The caller's context was cancelled before a result arrived.
    #[error("context canceled")]
    Canceled,

    /// The caller's context deadline passed before a result arrived.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The request worker went away without reporting a result.
    #[error("request worker terminated before producing a result")]
    WorkerLost,
}

impl RoadsError {
    /// True for the two variants produced by a fired [`CallContext`](crate::cancel::CallContext).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RoadsError::Canceled | RoadsError::DeadlineExceeded)
    }
}
