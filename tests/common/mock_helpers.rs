//! Hand-written fakes for the backend seams
//!
//! The `mockall` mocks are only generated for unit tests, so integration
//! tests use these recording fakes instead.

use climavis_rs::backend::{
    Notification, NotificationSink, PollEvent, PollerFactory, PollerHandle, ServiceDiscovery,
};
use climavis_rs::types::{ConnectionStatus, SensorSample, SessionStats};
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==================== Recording Sink ====================

/// Everything the tracker reported, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Notify(Notification),
    Status(String),
    Connection(ConnectionStatus, Option<String>),
    Sample(SensorSample),
    Stats(SessionStats),
}

/// Cloneable sink; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn lost_count(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::ConnectionLost { .. }))
            .count()
    }

    pub fn reconnected_count(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::Reconnected { .. }))
            .count()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, notification: Notification) {
        self.push(SinkEvent::Notify(notification));
    }

    fn status_message(&mut self, message: String) {
        self.push(SinkEvent::Status(message));
    }

    fn connection_status(&mut self, status: ConnectionStatus, address: Option<String>) {
        self.push(SinkEvent::Connection(status, address));
    }

    fn sample(&mut self, sample: SensorSample) {
        self.push(SinkEvent::Sample(sample));
    }

    fn stats(&mut self, stats: SessionStats) {
        self.push(SinkEvent::Stats(stats));
    }
}

// ==================== Fake Poller ====================

/// Produces the next event a fake poller emits for an address
pub type Behavior = Arc<dyn Fn(&str) -> Option<PollEvent> + Send + Sync>;

/// Factory whose pollers run on real threads but never touch the network
///
/// Tracks every spawn and the number of pollers alive at once.
#[derive(Clone)]
pub struct FakePollerFactory {
    behavior: Behavior,
    interval: Duration,
    spawned: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
}

impl FakePollerFactory {
    /// Pollers that only wait to be stopped
    pub fn silent() -> Self {
        Self::with_behavior(|_| None)
    }

    pub fn with_behavior(
        behavior: impl Fn(&str) -> Option<PollEvent> + Send + Sync + 'static,
    ) -> Self {
        Self {
            behavior: Arc::new(behavior),
            interval: Duration::from_millis(10),
            spawned: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn spawn_count(&self, address: &str) -> usize {
        self.spawned().iter().filter(|a| *a == address).count()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

impl PollerFactory for FakePollerFactory {
    fn spawn(&mut self, address: &str) -> PollerHandle {
        self.spawned.lock().unwrap().push(address.to_string());
        let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now_live, Ordering::SeqCst);

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (event_tx, event_rx) = unbounded();
        let behavior = Arc::clone(&self.behavior);
        let live = Arc::clone(&self.live);
        let interval = self.interval;
        let thread_address = address.to_string();

        let thread = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(event) = behavior(&thread_address) {
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            live.fetch_sub(1, Ordering::SeqCst);
            let _ = event_tx.send(PollEvent::Finished);
        });

        PollerHandle::from_parts(address, stop_tx, event_rx, Some(thread))
    }
}

// ==================== Fake Discovery ====================

/// Discovery that answers immediately with a fixed result
#[derive(Debug, Clone, Default)]
pub struct FakeDiscovery {
    result: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeDiscovery {
    pub fn finding(address: &str) -> Self {
        Self {
            result: Some(address.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ServiceDiscovery for FakeDiscovery {
    fn discover(&self, _window: Duration) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
