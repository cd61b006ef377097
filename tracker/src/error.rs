use thiserror::Error;

use crate::models::{PositionErrorCode, TripPhase};

#[derive(Debug, Error)]
pub enum TripError {
    #[error("position unavailable: {0}")]
    PositionUnavailable(PositionErrorCode),
    #[error("cannot {action} a trip while it is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: TripPhase,
    },
    #[error("trip duration is zero, average speed is undefined")]
    DegenerateDuration,
    #[error("position source refused the subscription: {0}")]
    Subscribe(String),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read GPX file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("invalid track point timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("track point {index} has no timestamp")]
    MissingTimestamp { index: usize },
    #[error("GPX file contains no track points")]
    EmptyTrack,
    #[error("trip error during replay: {0}")]
    Trip(#[from] TripError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
