use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::listing::{search, BatchSummary, BusinessWithDistance, ListingStore, SearchQuery, SortOrder};
use crate::location::gazetteer::{area_list, AreaInfo};
use crate::location::{navigation_link, Coordinates, LocationError, LocationRecord};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        let status = match e {
            LocationError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
            LocationError::NotFound(_) => StatusCode::NOT_FOUND,
            LocationError::Network(_)
            | LocationError::Http { .. }
            | LocationError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            LocationError::Store(_) | LocationError::Config(_) | LocationError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, e.to_string())
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

/// Geocoding blocks on the throttle, so it never runs on the async workers.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Worker failed: {}", e)))?
}

// ─── GET /api/areas ──────────────────────────────────────────────

pub async fn areas() -> Json<Vec<AreaInfo>> {
    Json(area_list())
}

// ─── GET /api/parse ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ParseQuery {
    pub link: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub address: Option<String>,
    pub place: Option<String>,
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_link: Option<String>,
}

pub async fn parse_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ParseQuery>,
) -> Result<Json<ParseResponse>, ApiError> {
    let link = params.link.as_deref().unwrap_or("").trim();
    if link.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'link' parameter"));
    }

    let parsed = state
        .parser
        .parse(link)
        .ok_or_else(|| api_error(StatusCode::UNPROCESSABLE_ENTITY, "Not a recognised location link"))?;

    let coordinates = parsed.coordinates();
    Ok(Json(ParseResponse {
        navigation_link: coordinates.as_ref().map(navigation_link),
        address: parsed.address,
        place: parsed.place,
        coordinates,
    }))
}

// ─── GET /api/search ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct SearchParams {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub q: Option<String>,
    /// Comma-separated; any of them matches.
    pub category: Option<String>,
    /// Comma-separated; all of them must match.
    pub tag: Option<String>,
    pub sort: Option<String>,
}

impl SearchParams {
    fn to_query(&self, default_radius_km: f64) -> Result<SearchQuery, ApiError> {
        let center = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)?),
            (None, None) => None,
            _ => return Err(api_error(StatusCode::BAD_REQUEST, "Provide both 'lat' and 'lng'")),
        };
        if self.radius.is_some_and(|r| !r.is_finite() || r < 0.0) {
            return Err(api_error(StatusCode::BAD_REQUEST, "'radius' must be a non-negative number"));
        }
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse::<SortOrder>().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
            None => SortOrder::default(),
        };

        Ok(SearchQuery {
            radius_km: center.map(|_| self.radius.unwrap_or(default_radius_km)),
            center,
            text: self.q.clone(),
            categories: split_list(self.category.as_deref()),
            tags: split_list(self.tag.as_deref()),
            sort,
        })
    }
}

pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BusinessWithDistance>>, ApiError> {
    let start = Instant::now();
    let query = params.to_query(state.config.default_search_radius_km)?;
    let businesses = state.store().all();
    let results = search(&businesses, &query);

    log::info!(
        "GET /api/search center={} radius={:?} -> {} of {} ({:.1}ms)",
        query.center.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
        query.radius_km,
        results.len(),
        businesses.len(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Json(results))
}

// ─── POST /api/enhance ───────────────────────────────────────────

pub async fn enhance_all(State(state): State<Arc<AppState>>) -> Result<Json<BatchSummary>, ApiError> {
    let start = Instant::now();
    let summary = blocking(move || {
        let mut store = state.shared_store();
        let summary = state.pipeline().enhance_all(&mut store);
        Ok(summary)
    })
    .await?;

    log::info!(
        "POST /api/enhance -> {}/{} enhanced ({:.1}s)",
        summary.success,
        summary.total(),
        start.elapsed().as_secs_f64(),
    );
    Ok(Json(summary))
}

// ─── GET /api/businesses/{id}/location ───────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub id: String,
    pub location: LocationRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_link: Option<String>,
}

/// Stored location of one listing, resolving it on first request.
pub async fn business_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LocationResponse>, ApiError> {
    let stored = state
        .store()
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No listing with id '{}'", id)))?
        .location;

    let location = match stored {
        Some(record) => record,
        None => {
            let id = id.clone();
            blocking(move || {
                let mut store = state.shared_store();
                let resolved = state.pipeline().enhance_stored(&mut store, &id);
                resolved.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Listing has no resolvable location"))?
        }
    };

    Ok(Json(LocationResponse {
        navigation_link: location.coordinates.as_ref().map(navigation_link),
        id,
        location,
    }))
}

// ─── Helpers ─────────────────────────────────────────────────────

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
