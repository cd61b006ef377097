use std::sync::Arc;

use crate::clock::ManualClock;
use crate::error::ReplayError;
use crate::models::{PositionFix, PositionOptions, TripSummary};
use crate::position::PushSource;
use crate::trip::TripTracker;

/// Drives a recorded track through a fresh tracker, moving the clock to each
/// fix's timestamp before it is delivered.
pub fn replay_fixes(
    fixes: &[PositionFix],
    options: PositionOptions,
) -> Result<TripSummary, ReplayError> {
    let first = fixes.first().ok_or(ReplayError::EmptyTrack)?;
    let start_time = first
        .timestamp
        .ok_or(ReplayError::MissingTimestamp { index: 0 })?;

    let clock = Arc::new(ManualClock::new(start_time));
    let source = PushSource::new();
    let mut tracker = TripTracker::new(Arc::new(source.clone()), clock.clone(), options);
    tracker.start()?;

    for (index, fix) in fixes.iter().enumerate() {
        let timestamp = fix
            .timestamp
            .ok_or(ReplayError::MissingTimestamp { index })?;
        clock.set(timestamp);
        source.publish_fix(*fix);
        tracker.poll_events();
    }

    Ok(tracker.stop()?)
}
