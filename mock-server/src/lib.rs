use axum::{extract::RawQuery, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const KPH_LIMIT: f64 = 100.0;
pub const MPH_LIMIT: f64 = 62.14;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnappedPoint {
    pub location: LatLng,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_index: Option<usize>,
    pub place_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapToRoadsResponse {
    pub snapped_points: Vec<SnappedPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLimit {
    pub place_id: String,
    pub speed_limit: f64,
    pub units: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLimitsResponse {
    pub speed_limits: Vec<SpeedLimit>,
    pub snapped_points: Vec<SnappedPoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub status: String,
}

type Rejection = (StatusCode, Json<ErrorEnvelope>);
type ApiResult<T> = Result<Json<T>, Rejection>;

fn reject(code: StatusCode, status: &str, message: &str) -> Rejection {
    (
        code,
        Json(ErrorEnvelope {
            error: ErrorBody {
                code: code.as_u16(),
                message: message.to_string(),
                status: status.to_string(),
            },
        }),
    )
}

fn bad_request(message: &str) -> Rejection {
    reject(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message)
}

pub fn app() -> Router {
    Router::new()
        .route("/v1/snapToRoads", get(snap_to_roads))
        .route("/v1/speedLimits", get(speed_limits))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Decoded query pairs in arrival order; repeated keys stay repeated.
struct Params(Vec<(String, String)>);

impl Params {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

fn authorize(query: Option<String>) -> Result<Params, Rejection> {
    let params = Params(
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect(),
    );
    match params.get("key") {
        Some(key) if !key.is_empty() => Ok(params),
        _ => Err(reject(
            StatusCode::FORBIDDEN,
            "PERMISSION_DENIED",
            "The request is missing a valid API key.",
        )),
    }
}

fn parse_path(raw: &str) -> Result<Vec<LatLng>, Rejection> {
    raw.split('|')
        .map(|pair| -> Result<LatLng, Rejection> {
            let (lat, lng) = pair
                .split_once(',')
                .ok_or_else(|| bad_request("Invalid path"))?;
            let lat = lat.trim().parse().map_err(|_| bad_request("Invalid path"))?;
            let lng = lng.trim().parse().map_err(|_| bad_request("Invalid path"))?;
            Ok(LatLng { lat, lng })
        })
        .collect()
}

/// Each point snaps onto itself. With `interpolate`, a midpoint without an
/// original index goes between every consecutive pair.
pub fn snap(path: &[LatLng], interpolate: bool) -> Vec<SnappedPoint> {
    let mut points = Vec::with_capacity(path.len() * 2);
    for (i, point) in path.iter().enumerate() {
        if interpolate && i > 0 {
            let prev = path[i - 1];
            points.push(SnappedPoint {
                location: LatLng {
                    lat: (prev.lat + point.lat) / 2.0,
                    lng: (prev.lng + point.lng) / 2.0,
                },
                original_index: None,
                place_id: format!("place-{}-{i}", i - 1),
            });
        }
        points.push(SnappedPoint {
            location: *point,
            original_index: Some(i),
            place_id: format!("place-{i}"),
        });
    }
    points
}

async fn snap_to_roads(RawQuery(query): RawQuery) -> ApiResult<SnapToRoadsResponse> {
    let params = authorize(query)?;
    let path = params
        .get("path")
        .ok_or_else(|| bad_request("path is required"))?;
    let path = parse_path(path)?;
    let interpolate = params.get("interpolate") == Some("true");
    Ok(Json(SnapToRoadsResponse {
        snapped_points: snap(&path, interpolate),
    }))
}

async fn speed_limits(RawQuery(query): RawQuery) -> ApiResult<SpeedLimitsResponse> {
    let params = authorize(query)?;
    let place_ids = params.get_all("placeId");
    let path = match params.get("path") {
        Some(raw) => parse_path(raw)?,
        None => Vec::new(),
    };
    if path.is_empty() && place_ids.is_empty() {
        return Err(bad_request("path or placeId is required"));
    }
    let (limit, units) = match params.get("units") {
        None | Some("KPH") => (KPH_LIMIT, "KPH"),
        Some("MPH") => (MPH_LIMIT, "MPH"),
        Some(_) => return Err(bad_request("Invalid units")),
    };

    let snapped_points = snap(&path, false);
    let speed_limits = snapped_points
        .iter()
        .map(|p| p.place_id.clone())
        .chain(place_ids)
        .map(|place_id| SpeedLimit {
            place_id,
            speed_limit: limit,
            units: units.to_string(),
        })
        .collect();

    Ok(Json(SpeedLimitsResponse {
        speed_limits,
        snapped_points,
    }))
}
