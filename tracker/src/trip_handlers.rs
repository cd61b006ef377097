// Handlers for the /api/trip endpoints used by the map client.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::TripError;
use crate::models::{
    ApiError, MapView, PositionErrorReport, PositionFix, PositionOptions, TripSnapshot,
    TripSummary,
};
use crate::AppState;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// GET /api/trip - Current phase, counters and the summary once completed
pub async fn get_trip(State(state): State<AppState>) -> Json<TripSnapshot> {
    let mut tracker = state.tracker.lock().await;
    tracker.poll_events();
    Json(tracker.snapshot())
}

/// POST /api/trip/start - Begin recording a new trip
pub async fn start_trip(State(state): State<AppState>) -> ApiResult<Json<TripSnapshot>> {
    let mut tracker = state.tracker.lock().await;
    tracker.start().map_err(trip_error_to_api_error)?;
    Ok(Json(tracker.snapshot()))
}

/// POST /api/trip/stop - Finish the active trip and return its summary
pub async fn stop_trip(State(state): State<AppState>) -> ApiResult<Json<TripSummary>> {
    let mut tracker = state.tracker.lock().await;
    tracker
        .stop()
        .map(Json)
        .map_err(trip_error_to_api_error)
}

/// POST /api/trip/fix - Deliver a position fix from the client device
pub async fn push_fix(
    State(state): State<AppState>,
    Json(fix): Json<PositionFix>,
) -> ApiResult<StatusCode> {
    let mut tracker = state.tracker.lock().await;
    if state.source.publish_fix(fix) == 0 {
        return Err(not_listening());
    }
    tracker.poll_events();
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/trip/error - Report that the client device could not get a fix
pub async fn push_error(
    State(state): State<AppState>,
    Json(report): Json<PositionErrorReport>,
) -> ApiResult<StatusCode> {
    let mut tracker = state.tracker.lock().await;
    if state.source.publish_error(report.code) == 0 {
        return Err(not_listening());
    }
    tracker.poll_events();
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/trip/map - Marker position and polyline for the map
pub async fn get_map_view(State(state): State<AppState>) -> Json<MapView> {
    let mut tracker = state.tracker.lock().await;
    tracker.poll_events();
    Json(tracker.map_view())
}

/// GET /api/trip/summary - Summary of the last completed trip
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<TripSummary>> {
    let tracker = state.tracker.lock().await;
    tracker.summary().cloned().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                message: format!("no completed trip (trip is {})", tracker.phase()),
            }),
        )
    })
}

/// GET /api/trip/options - Watch options the client should use for its position source
pub async fn get_options(State(state): State<AppState>) -> Json<PositionOptions> {
    Json(state.tracker.lock().await.options())
}

/// DELETE /api/trip - Discard an active trip and release the position source
pub async fn teardown_trip(State(state): State<AppState>) -> StatusCode {
    state.tracker.lock().await.teardown();
    StatusCode::NO_CONTENT
}

fn not_listening() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::CONFLICT,
        Json(ApiError {
            message: "no active trip is listening for positions".to_string(),
        }),
    )
}

/// Convert TripError to API error response
fn trip_error_to_api_error(err: TripError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        TripError::InvalidTransition { .. } => StatusCode::CONFLICT,
        TripError::Subscribe(_) | TripError::PositionUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        TripError::DegenerateDuration => StatusCode::UNPROCESSABLE_ENTITY,
    };

    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
