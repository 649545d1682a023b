//! Client core for the Roads API snap-to-road and speed-limits endpoints.
//!
//! # Overview
//! Validates requests, encodes them as signed GET query strings, runs the
//! HTTP exchange through a pluggable transport and decodes the JSON replies
//! into typed responses. Each async operation can be abandoned through a
//! [`CallContext`].
//!
//! # Design
//! - `RoadsClient` holds only its base URL and two collaborators: an
//!   [`HttpTransport`] and an [`AuthQuery`] signer.
//! - Each endpoint is split into `build_*` and `parse_*`, so the I/O boundary
//!   stays explicit and the core can be driven without a network.
//! - Errors from validation, signing, transport and decoding reach the caller
//!   unchanged. There are no retries and no caching.

pub mod auth;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use auth::{ApiKeyAuth, AuthQuery};
pub use cancel::{run_cancellable, CallContext, CancelReason};
pub use client::RoadsClient;
pub use config::ClientConfig;
pub use error::{RoadsError, TransportError};
pub use http::{HttpRequest, HttpResponse, HttpTransport, QueryParams, UreqTransport};
pub use types::{
    LatLng, SnapToRoadRequest, SnapToRoadResponse, SnappedPoint, SpeedLimit, SpeedLimitUnit,
    SpeedLimitsRequest, SpeedLimitsResponse,
};
