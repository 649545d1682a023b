//! Request building, response parsing and the cancellable operations for the
//! Roads API.
//!
//! # Design
//! Each endpoint is split into a `build_*` method that validates the request,
//! encodes its parameters and has them signed, and a `parse_*` method that
//! turns an `HttpResponse` into typed data. Both are usable on their own when
//! the caller wants to run the HTTP exchange itself. The async operations
//! chain build, transport and parse inside [`run_cancellable`] so the
//! caller's [`CallContext`] can abandon the call at any point.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::auth::{ApiKeyAuth, AuthQuery};
use crate::cancel::{run_cancellable, CallContext};
use crate::config::ClientConfig;
use crate::error::RoadsError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, QueryParams, UreqTransport};
use crate::types::{
    join_path, SnapToRoadRequest, SnapToRoadResponse, SpeedLimitsRequest, SpeedLimitsResponse,
};

pub const SNAP_TO_ROADS_PATH: &str = "/v1/snapToRoads";
pub const SPEED_LIMITS_PATH: &str = "/v1/speedLimits";

struct Inner {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthQuery>,
}

/// Client for the snap-to-road and speed-limits endpoints.
///
/// Cloning is cheap and clones share the transport and signer. No response
/// data is kept between calls.
#[derive(Clone)]
pub struct RoadsClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for RoadsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoadsClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl RoadsClient {
    /// Client using `ureq` for transport and the configured API key for auth.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout, config.user_agent.clone()));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let auth = Arc::new(ApiKeyAuth::new(config.api_key.clone()));
        Self::with_collaborators(config, transport, auth)
    }

    pub fn with_collaborators(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthQuery>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                transport,
                auth,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // -----------------------------------------------------------------------
    // Cancellable operations
    // -----------------------------------------------------------------------

    /// Snaps `request.path` onto roads.
    ///
    /// Fails with [`RoadsError::EmptyPath`] before any network activity when
    /// the path is empty.
    pub async fn snap_to_road(
        &self,
        ctx: &CallContext,
        request: &SnapToRoadRequest,
    ) -> Result<SnapToRoadResponse, RoadsError> {
        request.validate()?;
        let client = self.clone();
        let request = request.clone();
        run_cancellable(ctx, move || {
            let http_request = client.build_snap_to_road(&request)?;
            let response = client.execute(&http_request)?;
            client.parse_snap_to_road(response)
        })
        .await
    }

    /// Fetches speed limits for a path, a set of place IDs, or both.
    ///
    /// Fails with [`RoadsError::MissingPathOrPlaceId`] before any network
    /// activity when both are empty.
    pub async fn speed_limits(
        &self,
        ctx: &CallContext,
        request: &SpeedLimitsRequest,
    ) -> Result<SpeedLimitsResponse, RoadsError> {
        request.validate()?;
        let client = self.clone();
        let request = request.clone();
        run_cancellable(ctx, move || {
            let http_request = client.build_speed_limits(&request)?;
            let response = client.execute(&http_request)?;
            client.parse_speed_limits(response)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Build / parse
    // -----------------------------------------------------------------------

    pub fn build_snap_to_road(&self, request: &SnapToRoadRequest) -> Result<HttpRequest, RoadsError> {
        request.validate()?;
        let mut query = QueryParams::new();
        query.set("path", join_path(&request.path));
        if request.interpolate {
            query.set("interpolate", "true");
        }
        self.signed_get(SNAP_TO_ROADS_PATH, query)
    }

    pub fn build_speed_limits(&self, request: &SpeedLimitsRequest) -> Result<HttpRequest, RoadsError> {
        request.validate()?;
        let mut query = QueryParams::new();
        if !request.path.is_empty() {
            query.set("path", join_path(&request.path));
        }
        for id in &request.place_ids {
            query.add("placeId", id.as_str());
        }
        if let Some(units) = request.units {
            query.set("units", units.as_str());
        }
        self.signed_get(SPEED_LIMITS_PATH, query)
    }

    pub fn parse_snap_to_road(&self, response: HttpResponse) -> Result<SnapToRoadResponse, RoadsError> {
        check_status(&response)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub fn parse_speed_limits(&self, response: HttpResponse) -> Result<SpeedLimitsResponse, RoadsError> {
        check_status(&response)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Signs against the path of the URL actually requested, so a base URL
    /// with a path prefix is part of what the signer sees.
    fn signed_get(&self, path: &str, query: QueryParams) -> Result<HttpRequest, RoadsError> {
        let url = Url::parse(&format!("{}{}", self.inner.base_url, path))?;
        let query = self.inner.auth.generate_auth_query(url.path(), query, false)?;
        Ok(HttpRequest {
            base_url: self.inner.base_url.clone(),
            path: path.to_string(),
            query,
            headers: Vec::new(),
        })
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RoadsError> {
        log::debug!("{}", dispatch_summary(request));
        self.inner
            .transport
            .execute(request)
            .map_err(RoadsError::Transport)
    }
}

/// One-line description of an outgoing request for the dispatch log.
fn dispatch_summary(request: &HttpRequest) -> String {
    format!(
        "GET {}{} ({} query params)",
        request.base_url,
        request.path,
        request.query_params().len()
    )
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map non-2xx responses to `Api` when the body is the service's error
/// envelope, `Http` otherwise.
fn check_status(response: &HttpResponse) -> Result<(), RoadsError> {
    if response.is_success() {
        return Ok(());
    }
    match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => Err(RoadsError::Api {
            status: response.status,
            message: envelope.error.message,
        }),
        Err(_) => Err(RoadsError::Http {
            status: response.status,
            body: response.body.clone(),
        }),
    }
}
