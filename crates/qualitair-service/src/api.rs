//! REST API endpoints for qualitair.
//!
//! All endpoints are read-only. Errors are returned as `{"error": message}`
//! via [`AppError`]: invalid parameters map to 400, missing data to 404 and
//! database failures to 500.
//!
//! Timestamps in query parameters are Unix seconds; timestamps in responses
//! are `YYYY-MM-DD HH:MM:SS` in UTC.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use qualitair_store::{BucketQuery, MeasurementBucket, MeasurementQuery, StoredMeasurement};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::AppState;

/// Bucket width used when `interval` is omitted (one hour).
pub const DEFAULT_BUCKET_INTERVAL: i64 = 3600;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/measurements", get(list_measurements))
        .route("/api/measurements/latest", get(latest_measurement))
        .route("/api/measurements/buckets", get(measurement_buckets))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Validate a `since`/`until` pair of Unix seconds.
///
/// Returns an error if `since > until` or either bound is out of range.
pub fn resolve_range(
    since: Option<i64>,
    until: Option<i64>,
) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), AppError> {
    if let (Some(since), Some(until)) = (since, until)
        && since > until
    {
        return Err(AppError::BadRequest(format!(
            "Invalid time range: 'since' ({}) must be less than or equal to 'until' ({})",
            since, until
        )));
    }
    Ok((to_datetime(since)?, to_datetime(until)?))
}

fn to_datetime(secs: Option<i64>) -> Result<Option<OffsetDateTime>, AppError> {
    secs.map(|s| {
        OffsetDateTime::from_unix_timestamp(s)
            .map_err(|_| AppError::BadRequest(format!("Timestamp out of range: {}", s)))
    })
    .transpose()
}

/// Query parameters for `/api/measurements`.
#[derive(Debug, Deserialize, Default)]
pub struct MeasurementsParams {
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Paginated response wrapper with metadata.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Number of items returned.
    pub count: usize,
    /// Offset from the newest measurement.
    pub offset: u32,
    /// Maximum items requested (if specified).
    pub limit: Option<u32>,
    /// Whether there are more items available.
    pub has_more: bool,
}

/// List measurements, newest first.
///
/// # Query Parameters
///
/// - `since`, `until`: Unix seconds, both inclusive
/// - `limit`: maximum number of measurements to return
/// - `offset`: number of measurements to skip
async fn list_measurements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MeasurementsParams>,
) -> Result<Json<PaginatedResponse<StoredMeasurement>>, AppError> {
    let (since, until) = resolve_range(params.since, params.until)?;

    let mut query = MeasurementQuery::new();
    if let Some(since) = since {
        query = query.since(since);
    }
    if let Some(until) = until {
        query = query.until(until);
    }
    // One extra row tells whether another page exists.
    if let Some(limit) = params.limit {
        query = query.limit(limit.saturating_add(1));
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let mut measurements = state.store.lock().await.query_measurements(&query)?;

    let has_more = params.limit.is_some_and(|l| measurements.len() > l as usize);
    if has_more {
        measurements.pop();
    }

    Ok(Json(PaginatedResponse {
        pagination: PaginationMeta {
            count: measurements.len(),
            offset: params.offset.unwrap_or(0),
            limit: params.limit,
            has_more,
        },
        data: measurements,
    }))
}

async fn latest_measurement(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StoredMeasurement>, AppError> {
    let latest = state.store.lock().await.latest_measurement()?;
    latest
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No measurements recorded yet".to_string()))
}

/// Query parameters for `/api/measurements/buckets`.
#[derive(Debug, Deserialize, Default)]
pub struct BucketsParams {
    /// Bucket width in seconds.
    pub interval: Option<i64>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<u32>,
}

/// Averages per time bucket, oldest first.
async fn measurement_buckets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BucketsParams>,
) -> Result<Json<Vec<MeasurementBucket>>, AppError> {
    let (since, until) = resolve_range(params.since, params.until)?;

    let mut query = BucketQuery::new(params.interval.unwrap_or(DEFAULT_BUCKET_INTERVAL));
    if let Some(since) = since {
        query = query.since(since);
    }
    if let Some(until) = until {
        query = query.until(until);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }

    let buckets = state.store.lock().await.query_buckets(&query)?;
    Ok(Json(buckets))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Store(qualitair_store::Error),
}

impl From<qualitair_store::Error> for AppError {
    fn from(e: qualitair_store::Error) -> Self {
        match e {
            qualitair_store::Error::InvalidArgument(msg) => AppError::BadRequest(msg),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use qualitair_store::Store;
    use qualitair_types::Reading;
    use time::macros::datetime;
    use tower::ServiceExt;

    use crate::config::Config;

    fn create_test_state() -> Arc<AppState> {
        let store = Store::open_in_memory().unwrap();
        AppState::new(store, Config::default())
    }

    /// Five measurements one minute apart starting at 2024-01-15 10:00:00 UTC
    /// (Unix 1705312800), CO2 400..=404.
    async fn seeded_state() -> Arc<AppState> {
        let state = create_test_state();
        {
            let store = state.store.lock().await;
            let start = datetime!(2024-01-15 10:00:00 UTC);
            for minute in 0..5i64 {
                let reading = Reading::new(400 + minute as i32, 10, 21.0, 40.0);
                store
                    .create_at(&reading, start + time::Duration::minutes(minute))
                    .unwrap();
            }
        }
        state
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = get(create_test_state(), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_list_measurements_empty() {
        let (status, json) = get(create_test_state(), "/api/measurements").await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["data"].as_array().unwrap().is_empty());
        assert_eq!(json["pagination"]["count"], 0);
        assert_eq!(json["pagination"]["has_more"], false);
    }

    #[tokio::test]
    async fn test_list_measurements_paginated() {
        let state = seeded_state().await;
        let (status, json) = get(state, "/api/measurements?limit=2&offset=1").await;

        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["co2"], 403);
        assert_eq!(data[1]["co2"], 402);
        assert_eq!(data[0]["timestamp"], "2024-01-15 10:03:00");
        assert_eq!(json["pagination"]["offset"], 1);
        assert_eq!(json["pagination"]["limit"], 2);
        assert_eq!(json["pagination"]["has_more"], true);
    }

    #[tokio::test]
    async fn test_list_measurements_last_page() {
        let state = seeded_state().await;
        let (_, json) = get(state, "/api/measurements?limit=3&offset=3").await;

        assert_eq!(json["pagination"]["count"], 2);
        assert_eq!(json["pagination"]["has_more"], false);
    }

    #[tokio::test]
    async fn test_list_measurements_time_range() {
        let state = seeded_state().await;
        // 10:01:00 through 10:03:00
        let (_, json) = get(state, "/api/measurements?since=1705312860&until=1705312980").await;

        let co2: Vec<i64> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["co2"].as_i64().unwrap())
            .collect();
        assert_eq!(co2, vec![403, 402, 401]);
    }

    #[tokio::test]
    async fn test_list_measurements_inverted_range() {
        let (status, json) = get(create_test_state(), "/api/measurements?since=200&until=100").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Invalid time range"));
    }

    #[tokio::test]
    async fn test_latest_measurement_not_found() {
        let (status, json) = get(create_test_state(), "/api/measurements/latest").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_latest_measurement() {
        let state = seeded_state().await;
        let (status, json) = get(state, "/api/measurements/latest").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["co2"], 404);
        assert_eq!(json["temperature"], 21.0);
        assert_eq!(json["timestamp"], "2024-01-15 10:04:00");
    }

    #[tokio::test]
    async fn test_buckets() {
        let state = seeded_state().await;
        let (status, json) = get(state, "/api/measurements/buckets?interval=120").await;

        assert_eq!(status, StatusCode::OK);
        let buckets = json.as_array().unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0]["bucket_start"], "2024-01-15 10:00:00");
        assert_eq!(buckets[0]["samples"], 2);
        assert_eq!(buckets[0]["co2"], 400.5);
        assert_eq!(buckets[2]["bucket_start"], "2024-01-15 10:04:00");
        assert_eq!(buckets[2]["samples"], 1);
    }

    #[tokio::test]
    async fn test_buckets_max_interval() {
        let state = seeded_state().await;
        let (status, json) =
            get(state, "/api/measurements/buckets?interval=9223372036854775807").await;

        assert_eq!(status, StatusCode::OK);
        let buckets = json.as_array().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0]["bucket_start"], "1970-01-01 00:00:00");
        assert_eq!(buckets[0]["samples"], 5);
    }

    #[tokio::test]
    async fn test_buckets_invalid_interval() {
        let state = seeded_state().await;
        let (status, json) = get(state, "/api/measurements/buckets?interval=0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_buckets_inverted_range() {
        let (status, _) = get(
            create_test_state(),
            "/api/measurements/buckets?interval=60&since=10&until=5",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_range_out_of_bounds() {
        assert!(matches!(
            resolve_range(Some(i64::MAX), None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_store_invalid_argument_is_bad_request() {
        let err = AppError::from(qualitair_store::Error::InvalidArgument("interval".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
