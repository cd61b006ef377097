pub mod clock;
pub mod config;
pub mod distance;
pub mod error;
pub mod gpx_import;
pub mod models;
pub mod position;
pub mod replay;
pub mod trip;
pub mod trip_handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::clock::{Clock, SystemClock};
use crate::models::PositionOptions;
use crate::position::PushSource;
use crate::trip::TripTracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<TripTracker>>,
    pub source: PushSource,
}

impl AppState {
    pub fn new(options: PositionOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: PositionOptions, clock: Arc<dyn Clock>) -> Self {
        let source = PushSource::new();
        let tracker = TripTracker::new(Arc::new(source.clone()), clock, options);
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            source,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/trip",
            get(trip_handlers::get_trip).delete(trip_handlers::teardown_trip),
        )
        .route("/api/trip/start", post(trip_handlers::start_trip))
        .route("/api/trip/stop", post(trip_handlers::stop_trip))
        .route("/api/trip/fix", post(trip_handlers::push_fix))
        .route("/api/trip/error", post(trip_handlers::push_error))
        .route("/api/trip/map", get(trip_handlers::get_map_view))
        .route("/api/trip/summary", get(trip_handlers::get_summary))
        .route("/api/trip/options", get(trip_handlers::get_options))
        .layer(cors)
        .with_state(state)
}
