use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use chrono::{DateTime, Utc};
use geo_types::Point;
use gpx::Waypoint;

use crate::error::ReplayError;
use crate::models::{GeoPoint, PositionFix};

/// Reads every track point of a GPX file, across tracks and segments, in file order.
pub fn load_track(path: &Path) -> Result<Vec<PositionFix>, ReplayError> {
    let file = File::open(path)?;
    load_track_from_reader(BufReader::new(file))
}

pub fn load_track_from_reader<R: Read>(reader: R) -> Result<Vec<PositionFix>, ReplayError> {
    let gpx = gpx::read(reader)?;
    let fixes = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .enumerate()
        .map(|(index, waypoint)| to_fix(index, waypoint))
        .collect::<Result<Vec<_>, _>>()?;

    if fixes.is_empty() {
        return Err(ReplayError::EmptyTrack);
    }
    tracing::debug!("loaded {} track points", fixes.len());
    Ok(fixes)
}

fn to_fix(index: usize, waypoint: &Waypoint) -> Result<PositionFix, ReplayError> {
    let time = waypoint
        .time
        .as_ref()
        .ok_or(ReplayError::MissingTimestamp { index })?;
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&time.format()?)?.into();
    Ok(PositionFix::at(to_geo_point(waypoint.point()), timestamp))
}

fn to_geo_point(point: Point<f64>) -> GeoPoint {
    GeoPoint::new(point.y(), point.x())
}
