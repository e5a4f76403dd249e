//! Shared sync status with subscriber fan-out.
//!
//! The engine owns the single status value and replaces it whole on every
//! transition; subscribers are plain callbacks invoked with each new value.
//! Subscribing delivers the current value immediately, so late subscribers
//! start from a known state instead of waiting for the next transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use jot_core::SyncStatus;

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    status: SyncStatus,
    listeners: HashMap<u64, Listener>,
    next_id: u64,
}

/// Status value plus listener registry. Clones share the same state.
///
/// Only the engine mutates the status; everything else reads or subscribes.
#[derive(Clone, Default)]
pub struct StatusBus {
    inner: Arc<Mutex<BusInner>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current status.
    pub fn current(&self) -> SyncStatus {
        self.inner.lock().unwrap().status.clone()
    }

    /// Register a listener for status transitions.
    ///
    /// The listener is invoked once with the current value before this call
    /// returns, then on every transition until the returned subscription is
    /// dropped.
    pub fn subscribe(&self, listener: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Subscription {
        let listener: Listener = Arc::new(listener);
        let (id, current) = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            (id, inner.status.clone())
        };
        listener(&current);
        Subscription {
            inner: self.inner.clone(),
            id,
        }
    }

    /// A reconciliation attempt is starting.
    pub(crate) fn begin(&self) {
        self.update(|s| {
            s.is_syncing = true;
            s.offline = false;
        });
    }

    /// The attempt finished clean.
    pub(crate) fn succeed(&self, at: DateTime<Utc>) {
        self.update(|s| {
            s.is_syncing = false;
            s.last_run = Some(at);
            s.last_error = None;
        });
    }

    /// The attempt failed; the message is kept until the next clean run.
    pub(crate) fn fail(&self, at: DateTime<Utc>, message: String) {
        self.update(|s| {
            s.is_syncing = false;
            s.last_run = Some(at);
            s.last_error = Some(message);
        });
    }

    /// The attempt was gated on connectivity. Does not count as a run.
    pub(crate) fn go_offline(&self) {
        self.update(|s| {
            s.is_syncing = false;
            s.offline = true;
        });
    }

    /// Re-assert the offline flag without running anything.
    pub(crate) fn assert_offline(&self) {
        self.update(|s| s.offline = true);
    }

    fn update(&self, apply: impl FnOnce(&mut SyncStatus)) {
        // Listeners run outside the lock so they may call back into the bus.
        let (status, listeners) = {
            let mut inner = self.inner.lock().unwrap();
            apply(&mut inner.status);
            let listeners: Vec<Listener> = inner.listeners.values().cloned().collect();
            (inner.status.clone(), listeners)
        };
        for listener in listeners {
            listener(&status);
        }
    }
}

/// Listener registration handle. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct Subscription {
    inner: Arc<Mutex<BusInner>>,
    id: u64,
}

impl Subscription {
    /// Remove the listener now instead of at end of scope.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jot_core::SyncState;

    fn recording(bus: &StatusBus) -> (Subscription, Arc<Mutex<Vec<SyncStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = bus.subscribe(move |status| sink.lock().unwrap().push(status.clone()));
        (sub, seen)
    }

    #[test]
    fn test_subscribe_delivers_current_value_immediately() {
        let bus = StatusBus::new();
        bus.assert_offline();

        let (_sub, seen) = recording(&bus);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].offline);
    }

    #[test]
    fn test_every_transition_notifies_subscribers() {
        let bus = StatusBus::new();
        let (_sub, seen) = recording(&bus);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        bus.begin();
        bus.succeed(at);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].state(), SyncState::Idle);
        assert_eq!(seen[1].state(), SyncState::Syncing);
        assert_eq!(seen[2].state(), SyncState::Idle);
        assert_eq!(seen[2].last_run, Some(at));
    }

    #[test]
    fn test_dropped_subscription_stops_delivery() {
        let bus = StatusBus::new();
        let (sub, seen) = recording(&bus);

        bus.begin();
        drop(sub);
        bus.succeed(Utc::now());

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = StatusBus::new();
        let (sub, seen) = recording(&bus);

        sub.unsubscribe();
        bus.begin();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_multiple_subscribers_all_notified() {
        let bus = StatusBus::new();
        let (_a, seen_a) = recording(&bus);
        let (_b, seen_b) = recording(&bus);

        bus.begin();

        assert_eq!(seen_a.lock().unwrap().len(), 2);
        assert_eq!(seen_b.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_failure_is_kept_until_the_next_clean_run() {
        let bus = StatusBus::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        bus.begin();
        bus.fail(at, "Remote error: HTTP 503".into());
        assert_eq!(bus.current().state(), SyncState::Error);
        assert_eq!(bus.current().last_error.as_deref(), Some("Remote error: HTTP 503"));

        bus.begin();
        bus.succeed(at);
        assert_eq!(bus.current().state(), SyncState::Idle);
        assert!(bus.current().last_error.is_none());
    }

    #[test]
    fn test_offline_dominates_a_recorded_error() {
        let bus = StatusBus::new();
        bus.fail(Utc::now(), "boom".into());
        bus.assert_offline();
        assert_eq!(bus.current().state(), SyncState::Offline);
    }

    #[test]
    fn test_offline_gate_does_not_stamp_last_run() {
        let bus = StatusBus::new();
        bus.begin();
        bus.go_offline();

        let status = bus.current();
        assert!(status.offline);
        assert!(status.last_run.is_none());
    }

    #[test]
    fn test_begin_clears_the_offline_flag() {
        let bus = StatusBus::new();
        bus.go_offline();
        assert_eq!(bus.current().state(), SyncState::Offline);

        bus.begin();
        assert_eq!(bus.current().state(), SyncState::Syncing);
    }
}
