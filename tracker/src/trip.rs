use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::distance::{average_speed_kmh, total_distance_m};
use crate::error::TripError;
use crate::models::{
    GeoPoint, MapView, PositionErrorCode, PositionOptions, TripPhase, TripSnapshot, TripSummary,
};
use crate::position::{PositionEvent, PositionSource, Subscription, TryRecvError};

struct ActiveTrip {
    start_time: DateTime<Utc>,
    waypoints: Vec<GeoPoint>,
    subscription: Subscription,
    source_finished: bool,
}

struct CompletedTrip {
    waypoints: Vec<GeoPoint>,
    summary: TripSummary,
}

enum TripState {
    Idle,
    Active(ActiveTrip),
    Completed(CompletedTrip),
}

impl TripState {
    fn phase(&self) -> TripPhase {
        match self {
            TripState::Idle => TripPhase::Idle,
            TripState::Active(_) => TripPhase::Active,
            TripState::Completed(_) => TripPhase::Completed,
        }
    }
}

/// Records the path of one trip at a time and summarises it when stopped.
///
/// The tracker owns the subscription to its position source while a trip is
/// active; the subscription is released on [`stop`](Self::stop),
/// [`teardown`](Self::teardown), or when the tracker is dropped.
pub struct TripTracker {
    state: TripState,
    source: Arc<dyn PositionSource>,
    clock: Arc<dyn Clock>,
    options: PositionOptions,
    current_position: Option<GeoPoint>,
    last_error: Option<PositionErrorCode>,
}

impl TripTracker {
    pub fn new(
        source: Arc<dyn PositionSource>,
        clock: Arc<dyn Clock>,
        options: PositionOptions,
    ) -> Self {
        Self {
            state: TripState::Idle,
            source,
            clock,
            options,
            current_position: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.state.phase()
    }

    pub fn options(&self) -> PositionOptions {
        self.options
    }

    pub fn start(&mut self) -> Result<(), TripError> {
        if let TripState::Active(_) = self.state {
            return Err(self.rejected("start"));
        }

        let subscription = self.source.subscribe(&self.options)?;
        let start_time = self.clock.now();
        tracing::info!(
            "trip started at {start_time} (subscription {})",
            subscription.id()
        );

        self.last_error = None;
        self.state = TripState::Active(ActiveTrip {
            start_time,
            waypoints: Vec::new(),
            subscription,
            source_finished: false,
        });
        Ok(())
    }

    pub fn on_fix_received(&mut self, point: GeoPoint) -> Result<(), TripError> {
        let TripState::Active(trip) = &mut self.state else {
            return Err(self.rejected("record a fix for"));
        };
        trip.waypoints.push(point);
        self.current_position = Some(point);
        tracing::trace!(
            "fix {} at ({:.6}, {:.6})",
            trip.waypoints.len(),
            point.lat,
            point.lon
        );
        Ok(())
    }

    /// A failed fix never ends the trip; it is only logged and remembered.
    pub fn on_position_error(&mut self, code: PositionErrorCode) {
        if self.phase() != TripPhase::Active {
            tracing::debug!("ignoring position error ({code}) outside an active trip");
            return;
        }
        tracing::warn!("{}", TripError::PositionUnavailable(code));
        self.last_error = Some(code);
    }

    /// Handles every event already queued by the source, in delivery order.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let TripState::Active(trip) = &mut self.state else {
                return handled;
            };
            let event = match trip.subscription.try_next() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return handled,
                Err(TryRecvError::Disconnected) => {
                    if !trip.source_finished {
                        tracing::info!("position source ended the stream");
                        trip.source_finished = true;
                    }
                    return handled;
                }
            };

            match event {
                PositionEvent::Fix(fix) => {
                    // only fails outside an active trip, checked above
                    let _ = self.on_fix_received(fix.point);
                }
                PositionEvent::Error(code) => self.on_position_error(code),
            }
            handled += 1;
        }
    }

    /// Whether the source has closed its side of the active subscription.
    pub fn source_finished(&self) -> bool {
        matches!(&self.state, TripState::Active(trip) if trip.source_finished)
    }

    pub fn stop(&mut self) -> Result<TripSummary, TripError> {
        self.poll_events();

        let trip = match std::mem::replace(&mut self.state, TripState::Idle) {
            TripState::Active(trip) => trip,
            other => {
                self.state = other;
                return Err(self.rejected("stop"));
            }
        };
        let end_time = self.clock.now();
        let ActiveTrip {
            start_time,
            waypoints,
            subscription,
            ..
        } = trip;
        drop(subscription);

        let distance_m = total_distance_m(&waypoints);
        let speed_kmh = average_speed_kmh(distance_m, start_time, end_time).unwrap_or_else(|err| {
            tracing::warn!("{err}; reporting 0 km/h");
            0.0
        });

        let summary = TripSummary {
            start_time,
            end_time,
            waypoint_count: waypoints.len(),
            total_distance_m: distance_m,
            total_distance_km: distance_m / 1000.0,
            average_speed_kmh: speed_kmh,
        };
        tracing::info!(
            "trip completed: {} waypoints, {:.1} m, {:.2} km/h",
            summary.waypoint_count,
            summary.total_distance_m,
            summary.average_speed_kmh
        );

        self.state = TripState::Completed(CompletedTrip {
            waypoints,
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Drops an active trip without summarising it and releases the source.
    pub fn teardown(&mut self) {
        if let TripState::Active(trip) = &self.state {
            tracing::info!(
                "discarding active trip with {} waypoints",
                trip.waypoints.len()
            );
            self.state = TripState::Idle;
        }
    }

    pub fn current_position(&self) -> Option<GeoPoint> {
        self.current_position
    }

    /// Waypoints of the active trip, or of the last completed one.
    pub fn waypoints(&self) -> &[GeoPoint] {
        match &self.state {
            TripState::Idle => &[],
            TripState::Active(trip) => &trip.waypoints,
            TripState::Completed(trip) => &trip.waypoints,
        }
    }

    pub fn summary(&self) -> Option<&TripSummary> {
        match &self.state {
            TripState::Completed(trip) => Some(&trip.summary),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> TripSnapshot {
        let (start_time, end_time) = match &self.state {
            TripState::Idle => (None, None),
            TripState::Active(trip) => (Some(trip.start_time), None),
            TripState::Completed(trip) => {
                (Some(trip.summary.start_time), Some(trip.summary.end_time))
            }
        };
        TripSnapshot {
            phase: self.phase(),
            start_time,
            end_time,
            waypoint_count: self.waypoints().len(),
            current_position: self.current_position,
            last_error: self.last_error,
            summary: self.summary().cloned(),
        }
    }

    pub fn map_view(&self) -> MapView {
        MapView::new(self.current_position, self.waypoints().to_vec())
    }

    fn rejected(&self, action: &'static str) -> TripError {
        let err = TripError::InvalidTransition {
            action,
            phase: self.phase(),
        };
        tracing::debug!("{err}");
        err
    }
}
