//! Request and response DTOs for the Roads API.
//!
//! # Design
//! Request types are plain owned data; the client turns them into query
//! parameters and never mutates them. Response types decode straight from
//! the service JSON. Fields whose absence carries meaning are `Option`s
//! (`SnappedPoint::original_index` is `None` for interpolated points, never
//! a defaulted zero).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RoadsError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Canonical `"lat,lng"` form used in query strings.
impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for LatLng {
    type Err = RoadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RoadsError::InvalidLatLng(s.to_string());
        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        if lng.contains(',') {
            return Err(invalid());
        }
        let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| invalid())?;
        Ok(Self { lat, lng })
    }
}

/// Joins a path into the `|`-separated `path` query value.
pub(crate) fn join_path(path: &[LatLng]) -> String {
    path.iter()
        .map(LatLng::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Unit system for speed limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedLimitUnit {
    #[serde(rename = "MPH")]
    Mph,
    #[serde(rename = "KPH")]
    Kph,
}

impl SpeedLimitUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            SpeedLimitUnit::Mph => "MPH",
            SpeedLimitUnit::Kph => "KPH",
        }
    }
}

impl fmt::Display for SpeedLimitUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snap to road
// ---------------------------------------------------------------------------

/// Request payload for `/v1/snapToRoads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapToRoadRequest {
    /// Points to snap, in travel order. Must not be empty.
    pub path: Vec<LatLng>,
    /// Ask the service to add points that follow the road geometry.
    #[serde(default)]
    pub interpolate: bool,
}

impl SnapToRoadRequest {
    pub fn validate(&self) -> Result<(), RoadsError> {
        if self.path.is_empty() {
            return Err(RoadsError::EmptyPath);
        }
        Ok(())
    }
}

/// Snapped points returned by `/v1/snapToRoads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapToRoadResponse {
    #[serde(default)]
    pub snapped_points: Vec<SnappedPoint>,
    /// Set by the service when the input path looks implausible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
}

/// An input point moved onto the nearest road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnappedPoint {
    pub location: LatLng,
    /// Position of the matching point in the request path. `None` on
    /// interpolated points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_index: Option<u32>,
    #[serde(default)]
    pub place_id: String,
}

// ---------------------------------------------------------------------------
// Speed limits
// ---------------------------------------------------------------------------

/// Request payload for `/v1/speedLimits`. At least one of `path` and
/// `place_ids` must be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimitsRequest {
    #[serde(default)]
    pub path: Vec<LatLng>,
    /// Sent as repeated `placeId` parameters, in order, duplicates kept.
    #[serde(default)]
    pub place_ids: Vec<String>,
    /// `None` leaves the choice to the service, which answers in KPH.
    #[serde(default)]
    pub units: Option<SpeedLimitUnit>,
}

impl SpeedLimitsRequest {
    pub fn validate(&self) -> Result<(), RoadsError> {
        if self.path.is_empty() && self.place_ids.is_empty() {
            return Err(RoadsError::MissingPathOrPlaceId);
        }
        Ok(())
    }
}

/// Speed limits and, for path requests, the snapped points they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLimitsResponse {
    #[serde(default)]
    pub speed_limits: Vec<SpeedLimit>,
    #[serde(default)]
    pub snapped_points: Vec<SnappedPoint>,
}

/// Posted speed limit of one road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLimit {
    #[serde(default)]
    pub place_id: String,
    pub speed_limit: f64,
    pub units: SpeedLimitUnit,
}
