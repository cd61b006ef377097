use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub use tokio::sync::mpsc::error::TryRecvError;

use crate::error::TripError;
use crate::models::{PositionErrorCode, PositionFix, PositionOptions};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEvent {
    Fix(PositionFix),
    Error(PositionErrorCode),
}

/// Anything that can deliver position fixes to a trip.
///
/// `subscribe` hands back a [`Subscription`] that owns the receiving end of
/// the event stream. Dropping the subscription unsubscribes.
pub trait PositionSource: Send + Sync {
    fn subscribe(&self, options: &PositionOptions) -> Result<Subscription, TripError>;
}

type ReleaseFn = Box<dyn FnOnce(u64) + Send>;

/// Live registration with a position source.
pub struct Subscription {
    id: u64,
    events: UnboundedReceiver<PositionEvent>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    pub fn new<F>(id: u64, events: UnboundedReceiver<PositionEvent>, release: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        Self {
            id,
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Result<PositionEvent, TryRecvError> {
        self.events.try_recv()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.close();
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

/// Fan-out source fed from the outside: a client device posting its fixes,
/// or a replayer walking a recorded track.
#[derive(Clone, Default)]
pub struct PushSource {
    inner: Arc<Mutex<PushInner>>,
}

#[derive(Default)]
struct PushInner {
    next_id: u64,
    closed: bool,
    options: PositionOptions,
    subscribers: HashMap<u64, UnboundedSender<PositionEvent>>,
}

impl PushSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a fix to every subscriber. Returns how many received it.
    pub fn publish_fix(&self, fix: PositionFix) -> usize {
        self.publish(PositionEvent::Fix(fix))
    }

    pub fn publish_error(&self, code: PositionErrorCode) -> usize {
        self.publish(PositionEvent::Error(code))
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Options requested by the most recent subscriber.
    pub fn options(&self) -> PositionOptions {
        lock(&self.inner).options
    }

    /// Ends the stream for current subscribers and refuses new ones.
    pub fn close(&self) {
        let mut inner = lock(&self.inner);
        inner.closed = true;
        inner.subscribers.clear();
        tracing::debug!("position source closed");
    }

    fn publish(&self, event: PositionEvent) -> usize {
        let mut inner = lock(&self.inner);
        inner
            .subscribers
            .retain(|_, sender| sender.send(event).is_ok());
        inner.subscribers.len()
    }
}

impl PositionSource for PushSource {
    fn subscribe(&self, options: &PositionOptions) -> Result<Subscription, TripError> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(TripError::Subscribe("position source is closed".into()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.options = *options;
        inner.subscribers.insert(id, sender);
        tracing::debug!(
            "subscription {id} opened (high_accuracy={}, max_fix_age={:?}, timeout={:?})",
            options.high_accuracy,
            options.max_fix_age(),
            options.timeout()
        );

        let source: Weak<Mutex<PushInner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, receiver, move |id| {
            if let Some(inner) = source.upgrade() {
                lock(&inner).subscribers.remove(&id);
            }
            tracing::debug!("subscription {id} released");
        }))
    }
}

fn lock(inner: &Mutex<PushInner>) -> MutexGuard<'_, PushInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn fix(lat: f64, lon: f64) -> PositionFix {
        PositionFix::from(GeoPoint::new(lat, lon))
    }

    #[test]
    fn events_arrive_in_publish_order() {
        let source = PushSource::new();
        let mut subscription = source.subscribe(&PositionOptions::default()).unwrap();

        assert_eq!(source.publish_fix(fix(1.0, 1.0)), 1);
        assert_eq!(source.publish_error(PositionErrorCode::Timeout), 1);
        assert_eq!(source.publish_fix(fix(2.0, 2.0)), 1);

        assert_eq!(subscription.try_next(), Ok(PositionEvent::Fix(fix(1.0, 1.0))));
        assert_eq!(
            subscription.try_next(),
            Ok(PositionEvent::Error(PositionErrorCode::Timeout))
        );
        assert_eq!(subscription.try_next(), Ok(PositionEvent::Fix(fix(2.0, 2.0))));
        assert_eq!(subscription.try_next(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropping_the_subscription_unsubscribes() {
        let source = PushSource::new();
        let subscription = source.subscribe(&PositionOptions::default()).unwrap();
        assert_eq!(source.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(source.publish_fix(fix(0.0, 0.0)), 0);
    }

    #[test]
    fn subscription_outliving_the_source_drops_cleanly() {
        let source = PushSource::new();
        let mut subscription = source.subscribe(&PositionOptions::default()).unwrap();
        drop(source);
        assert_eq!(subscription.try_next(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn remembers_requested_options() {
        let source = PushSource::new();
        let options = PositionOptions {
            high_accuracy: false,
            max_fix_age_ms: 0,
            timeout_ms: 1_000,
        };
        let _subscription = source.subscribe(&options).unwrap();
        assert_eq!(source.options(), options);
    }

    #[test]
    fn closed_source_ends_streams_and_refuses_subscribers() {
        let source = PushSource::new();
        let mut subscription = source.subscribe(&PositionOptions::default()).unwrap();
        source.close();

        assert_eq!(subscription.try_next(), Err(TryRecvError::Disconnected));
        assert!(matches!(
            source.subscribe(&PositionOptions::default()),
            Err(TripError::Subscribe(_))
        ));
    }
}
