use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map centre used before the first fix arrives.
pub const FALLBACK_CENTER: GeoPoint = GeoPoint {
    lat: 20.5937,
    lon: 78.9629,
};

pub const DEFAULT_ZOOM: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A single position reported by a position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    #[serde(flatten)]
    pub point: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PositionFix {
    pub fn at(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            point,
            timestamp: Some(timestamp),
        }
    }
}

impl From<GeoPoint> for PositionFix {
    fn from(point: GeoPoint) -> Self {
        Self {
            point,
            timestamp: None,
        }
    }
}

/// Failure codes a geolocation watch can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl fmt::Display for PositionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PositionErrorCode::PermissionDenied => "permission denied",
            PositionErrorCode::PositionUnavailable => "position unavailable",
            PositionErrorCode::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionErrorReport {
    pub code: PositionErrorCode,
}

/// Options handed to the position source when a trip subscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,
    #[serde(default = "default_max_fix_age_ms")]
    pub max_fix_age_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl PositionOptions {
    pub fn max_fix_age(&self) -> Duration {
        Duration::from_millis(self.max_fix_age_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: default_high_accuracy(),
            max_fix_age_ms: default_max_fix_age_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

pub fn default_high_accuracy() -> bool {
    true
}

pub fn default_max_fix_age_ms() -> u64 {
    10_000
}

pub fn default_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripPhase {
    Idle,
    Active,
    Completed,
}

impl fmt::Display for TripPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TripPhase::Idle => "idle",
            TripPhase::Active => "active",
            TripPhase::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Result of a completed trip, shown once the trip is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub waypoint_count: usize,
    pub total_distance_m: f64,
    pub total_distance_km: f64,
    pub average_speed_kmh: f64,
}

impl fmt::Display for TripSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Distance: {:.2} km", self.total_distance_km)?;
        write!(f, "Average Speed: {:.2} km/h", self.average_speed_kmh)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub phase: TripPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub waypoint_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_position: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<PositionErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TripSummary>,
}

/// Everything the map widget needs to draw the marker and the polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_position: Option<GeoPoint>,
    pub path: Vec<GeoPoint>,
}

impl MapView {
    pub fn new(current_position: Option<GeoPoint>, path: Vec<GeoPoint>) -> Self {
        Self {
            center: current_position.unwrap_or(FALLBACK_CENTER),
            zoom: DEFAULT_ZOOM,
            current_position,
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_view_falls_back_to_default_center() {
        let view = MapView::new(None, Vec::new());
        assert_eq!(view.center, FALLBACK_CENTER);
        assert_eq!(view.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn map_view_centers_on_current_position() {
        let here = GeoPoint::new(45.93, 4.57);
        let view = MapView::new(Some(here), vec![here]);
        assert_eq!(view.center, here);
    }

    #[test]
    fn position_options_fill_missing_fields() {
        let options: PositionOptions = serde_json::from_str(r#"{"timeout_ms": 5000}"#).unwrap();
        assert!(options.high_accuracy);
        assert_eq!(options.max_fix_age(), Duration::from_secs(10));
        assert_eq!(options.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn position_fix_accepts_flat_coordinates() {
        let fix: PositionFix = serde_json::from_str(r#"{"lat": 1.5, "lon": 2.5}"#).unwrap();
        assert_eq!(fix.point, GeoPoint::new(1.5, 2.5));
        assert!(fix.timestamp.is_none());
    }

    #[test]
    fn summary_display_uses_two_decimals() {
        let now = Utc::now();
        let summary = TripSummary {
            start_time: now,
            end_time: now,
            waypoint_count: 3,
            total_distance_m: 2223.9,
            total_distance_km: 2.2239,
            average_speed_kmh: 2.2239,
        };
        assert_eq!(
            summary.to_string(),
            "Total Distance: 2.22 km\nAverage Speed: 2.22 km/h"
        );
    }
}
