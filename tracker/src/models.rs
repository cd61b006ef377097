pub use shared::{
    ApiError, GeoPoint, MapView, PositionErrorCode, PositionErrorReport, PositionFix,
    PositionOptions, TripPhase, TripSnapshot, TripSummary,
};
