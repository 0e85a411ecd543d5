//! Connection state machine
//!
//! [`ConnectionTracker`] consumes [`PollEvent`]s from the one active poller
//! and turns them into history updates, connection status changes and user
//! notifications. Before the first sample ever arrives it also drives the
//! [`AddressResolver`] cascade.
//!
//! Notification rules:
//!
//! - the first successful connection is silent
//! - every later `not Connected -> Connected` edge emits
//!   [`Notification::Reconnected`]
//! - every `Connected -> Disconnected` edge emits exactly one
//!   [`Notification::ConnectionLost`]; further errors stay quiet
//!
//! After the first connection, moving to a scanned or typed address is
//! tentative until that address delivers a sample. A successful move is
//! silent. If the new address fails to answer, polling returns to the last
//! address that worked, and a move away from a live link counts as a loss.
//!
//! Collaborators are injected ([`PollerFactory`], [`NotificationSink`],
//! [`ServiceDiscovery`]) so the whole machine runs without a network.

use crate::backend::device::{FetchError, FetchErrorKind};
use crate::backend::discovery::{spawn_scan, ServiceDiscovery};
use crate::backend::poller::{PollEvent, PollerFactory, PollerHandle};
use crate::backend::resolver::{AddressResolver, CascadeStep};
use crate::history::{write_history, SharedHistory};
use crate::types::{ConnectionStatus, SensorSample, SessionStats};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// User-facing notifications, each fired at most once per transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A sample arrived after a previous connection had been lost
    Reconnected { address: String },
    /// The link dropped after being connected
    ConnectionLost { reason: String },
    /// The cascade needs an address typed by the user
    ManualEntryRequested,
}

/// Receiver of everything the tracker wants the user to see
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send {
    fn notify(&mut self, notification: Notification);
    /// One-line status text
    fn status_message(&mut self, message: String);
    fn connection_status(&mut self, status: ConnectionStatus, address: Option<String>);
    /// Latest sample, including the live-only rain flag
    fn sample(&mut self, sample: SensorSample);
    fn stats(&mut self, stats: SessionStats);
}

/// Move to a new address made after the first connection
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSwitch {
    /// Address to return to if the new one never answers
    fallback: Option<String>,
    /// The link was up when the move started
    was_connected: bool,
}

/// Owned connection state machine
pub struct ConnectionTracker<F: PollerFactory, S: NotificationSink> {
    state: ConnectionStatus,
    state_address: Option<String>,
    has_connected_once: bool,
    resolver: AddressResolver,
    factory: F,
    sink: S,
    discovery: Arc<dyn ServiceDiscovery>,
    discovery_tx: Sender<Option<String>>,
    discovery_rx: Receiver<Option<String>>,
    scan_in_flight: bool,
    history: SharedHistory,
    active: Option<PollerHandle>,
    last_good_address: Option<String>,
    pending_switch: Option<PendingSwitch>,
    stats: SessionStats,
    shutdown_bound: Duration,
}

impl<F: PollerFactory, S: NotificationSink> ConnectionTracker<F, S> {
    /// Create an idle tracker; call [`start`](Self::start) to begin the cascade
    pub fn new(
        resolver: AddressResolver,
        factory: F,
        sink: S,
        discovery: Arc<dyn ServiceDiscovery>,
        history: SharedHistory,
        shutdown_bound: Duration,
    ) -> Self {
        let (discovery_tx, discovery_rx) = bounded(1);
        Self {
            state: ConnectionStatus::Disconnected,
            state_address: None,
            has_connected_once: false,
            resolver,
            factory,
            sink,
            discovery,
            discovery_tx,
            discovery_rx,
            scan_in_flight: false,
            history,
            active: None,
            last_good_address: None,
            pending_switch: None,
            stats: SessionStats::default(),
            shutdown_bound,
        }
    }

    // ==================== Accessors ====================

    pub fn state(&self) -> ConnectionStatus {
        self.state
    }

    pub fn has_connected_once(&self) -> bool {
        self.has_connected_once
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Address of the running poller, if any
    pub fn active_address(&self) -> Option<&str> {
        self.active.as_ref().map(PollerHandle::address)
    }

    pub fn last_good_address(&self) -> Option<&str> {
        self.last_good_address.as_deref()
    }

    pub fn scan_in_flight(&self) -> bool {
        self.scan_in_flight
    }

    /// Whether the active poller is on an address that has not answered yet
    pub fn switch_pending(&self) -> bool {
        self.pending_switch.is_some()
    }

    /// Event stream of the active poller
    pub fn event_receiver(&self) -> Option<Receiver<PollEvent>> {
        self.active.as_ref().map(|h| h.events().clone())
    }

    pub fn discovery_receiver(&self) -> &Receiver<Option<String>> {
        &self.discovery_rx
    }

    // ==================== Commands ====================

    /// Begin the initial-connection cascade
    pub fn start(&mut self) {
        tracing::info!(
            candidates = ?self.resolver.candidates(),
            "Starting connection cascade"
        );
        let step = self.resolver.next_step();
        self.apply_step(step);
    }

    /// Manual restart trigger: scan the network, then prompt
    ///
    /// A scan already in flight turns this into a no-op.
    pub fn search(&mut self) {
        if self.scan_in_flight {
            tracing::debug!("Search requested while a scan is running, ignoring");
            return;
        }
        let step = self.resolver.restart_search();
        self.apply_step(step);
    }

    /// Poll an address typed by the user
    pub fn connect_manual(&mut self, address: &str) {
        tracing::info!(address, "Manual address entered");
        let step = self.resolver.on_manual_entry(address);
        self.apply_step(step);
    }

    /// The user dismissed the manual prompt
    pub fn manual_entry_cancelled(&mut self) {
        self.resolver.on_manual_cancelled();
        if self.active.is_none() {
            self.set_state(ConnectionStatus::Disconnected, None);
            self.sink
                .status_message("Not connected. Use Search IP to try again.".to_string());
        }
    }

    /// Stop the active poller and wait (bounded) for it to finish
    pub fn stop(&mut self) {
        self.pending_switch = None;
        self.stop_active();
        tracing::info!("Connection tracker stopped");
    }

    // ==================== Events ====================

    pub fn handle_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::SampleReceived(sample) => self.on_sample(sample),
            PollEvent::ErrorOccurred(err) => self.on_error(err),
            PollEvent::Finished => {
                if let Some(handle) = self.active.take() {
                    tracing::debug!(address = handle.address(), "Poller finished on its own");
                }
            }
        }
    }

    pub fn handle_discovery_result(&mut self, found: Option<String>) {
        self.scan_in_flight = false;

        if let (Some(found), Some(active)) = (found.as_deref(), self.active_address()) {
            if found == active && self.state == ConnectionStatus::Connected {
                self.sink
                    .status_message(format!("Already connected to {}", found));
                return;
            }
        }

        let step = self.resolver.on_scan_result(found);
        self.apply_step(step);
    }

    /// Wait up to `timeout` for one poller or discovery event and handle it
    ///
    /// Returns `false` when nothing arrived.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        let events = self.event_receiver().unwrap_or_else(never);
        let discovery = self.discovery_rx.clone();

        select! {
            recv(events) -> msg => {
                self.handle_poll_event(msg.unwrap_or(PollEvent::Finished));
                true
            }
            recv(discovery) -> msg => {
                if let Ok(found) = msg {
                    self.handle_discovery_result(found);
                }
                true
            }
            default(timeout) => false,
        }
    }

    fn on_sample(&mut self, sample: SensorSample) {
        write_history(&self.history).append(&sample);
        self.stats.samples_received += 1;
        self.sink.sample(sample);

        let switch = self.pending_switch.take();

        if self.state != ConnectionStatus::Connected {
            let address = self.active_address().map(str::to_string);

            if switch.as_ref().is_some_and(|s| s.was_connected) {
                tracing::info!(address = ?address, "Switched station address");
            } else if self.has_connected_once {
                tracing::info!(address = ?address, "Reconnected");
                self.sink.notify(Notification::Reconnected {
                    address: address.clone().unwrap_or_default(),
                });
            } else {
                tracing::info!(address = ?address, "Connected for the first time");
                self.has_connected_once = true;
                self.resolver.retire();
            }

            if let Some(address) = &address {
                self.sink.status_message(format!("Connected to {}", address));
            }
            self.last_good_address = address.clone();
            self.set_state(ConnectionStatus::Connected, address);
        }

        self.sink.stats(self.stats.clone());
    }

    fn on_error(&mut self, err: FetchError) {
        match err.kind() {
            FetchErrorKind::Connectivity => self.stats.connectivity_errors += 1,
            FetchErrorKind::Payload => self.stats.payload_errors += 1,
        }
        self.sink.stats(self.stats.clone());
        self.sink.status_message(format!("Error: {}", err));

        if !self.has_connected_once {
            if err.is_connection_level() {
                let step = self.resolver.next_step();
                self.apply_step(step);
            } else {
                tracing::debug!("Station reachable but payload invalid, staying on address");
            }
            return;
        }

        if let Some(switch) = self.pending_switch.take() {
            if err.is_connection_level() {
                self.abandon_switch(switch, &err);
            } else {
                // Station answered, keep waiting for a usable reading
                self.pending_switch = Some(switch);
            }
            return;
        }

        if self.state == ConnectionStatus::Connected {
            tracing::info!(address = ?self.last_good_address, "Connection lost: {}", err);
            let address = self.active_address().map(str::to_string);
            self.set_state(ConnectionStatus::Disconnected, address);
            self.sink.notify(Notification::ConnectionLost {
                reason: err.to_string(),
            });
        }
    }

    /// Give up on a new address that never answered
    fn abandon_switch(&mut self, switch: PendingSwitch, err: &FetchError) {
        let failed = self.active_address().map(str::to_string);
        tracing::info!(
            address = ?failed,
            fallback = ?switch.fallback,
            "Address switch failed: {}",
            err
        );

        self.set_state(ConnectionStatus::Disconnected, failed);
        if switch.was_connected {
            self.sink.notify(Notification::ConnectionLost {
                reason: err.to_string(),
            });
        }

        if let Some(fallback) = switch.fallback {
            self.stop_active();
            self.sink
                .status_message(format!("Falling back to {}", fallback));
            self.active = Some(self.factory.spawn(&fallback));
        }
    }

    // ==================== Cascade ====================

    fn apply_step(&mut self, step: CascadeStep) {
        tracing::debug!(?step, phase = ?self.resolver.phase(), "Cascade step");

        match step {
            CascadeStep::Probe(address) => {
                if self.has_connected_once {
                    let was_connected = match &self.pending_switch {
                        Some(pending) => pending.was_connected,
                        None => self.state == ConnectionStatus::Connected,
                    };
                    let fallback = self
                        .last_good_address
                        .clone()
                        .filter(|good| *good != address);
                    self.pending_switch = Some(PendingSwitch {
                        fallback,
                        was_connected,
                    });
                }
                self.stop_active();
                self.sink
                    .status_message(format!("Connecting to {}...", address));
                self.set_state(ConnectionStatus::Connecting, Some(address.clone()));
                self.active = Some(self.factory.spawn(&address));
            }
            CascadeStep::Scan(window) => {
                if !self.has_connected_once {
                    self.stop_active();
                    self.set_state(ConnectionStatus::Connecting, None);
                }
                self.launch_scan(window);
            }
            CascadeStep::Prompt => {
                if !self.has_connected_once {
                    self.stop_active();
                    self.set_state(ConnectionStatus::Disconnected, None);
                }
                self.sink
                    .status_message("Station not found on the network".to_string());
                self.sink.notify(Notification::ManualEntryRequested);
            }
            CascadeStep::Exhausted => {
                self.stop_active();
                self.set_state(ConnectionStatus::Disconnected, None);
                self.sink.status_message(
                    "Station not found. Use Search IP to try again.".to_string(),
                );
            }
        }
    }

    fn launch_scan(&mut self, window: Duration) {
        if self.scan_in_flight {
            return;
        }
        self.scan_in_flight = true;
        self.sink.status_message("Searching network...".to_string());

        if let Err(e) = spawn_scan(Arc::clone(&self.discovery), window, self.discovery_tx.clone()) {
            tracing::error!("Failed to spawn discovery thread: {}", e);
            let _ = self.discovery_tx.try_send(None);
        }
    }

    fn stop_active(&mut self) {
        if let Some(handle) = self.active.take() {
            let address = handle.address().to_string();
            tracing::debug!(address = %address, "Stopping poller");
            if !handle.stop_and_wait(self.shutdown_bound) {
                tracing::warn!(address = %address, "Poller stop was not acknowledged");
            }
        }
    }

    fn set_state(&mut self, state: ConnectionStatus, address: Option<String>) {
        if self.state == state && self.state_address == address {
            return;
        }
        tracing::info!(from = %self.state, to = %state, address = ?address, "Connection state changed");
        self.state = state;
        self.state_address = address.clone();
        self.sink.connection_status(state, address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{read_history, HistoryBuffer};
    use crate::types::Channel;
    use crossbeam_channel::unbounded;
    use mockall::predicate::eq;

    struct StubFactory {
        spawned: Vec<String>,
    }

    impl PollerFactory for StubFactory {
        fn spawn(&mut self, address: &str) -> PollerHandle {
            self.spawned.push(address.to_string());
            // Event sender dropped right away: stopping is acknowledged immediately
            let (stop_tx, _stop_rx) = bounded(1);
            let (_event_tx, event_rx) = unbounded();
            PollerHandle::from_parts(address, stop_tx, event_rx, None)
        }
    }

    struct NoDiscovery;

    impl ServiceDiscovery for NoDiscovery {
        fn discover(&self, _window: Duration) -> Option<String> {
            None
        }
    }

    fn quiet_sink() -> MockNotificationSink {
        let mut sink = MockNotificationSink::new();
        sink.expect_status_message().return_const(());
        sink.expect_connection_status().return_const(());
        sink.expect_sample().return_const(());
        sink.expect_stats().return_const(());
        sink
    }

    fn tracker(
        sink: MockNotificationSink,
        candidates: &[&str],
    ) -> ConnectionTracker<StubFactory, MockNotificationSink> {
        ConnectionTracker::new(
            AddressResolver::new(
                candidates.iter().map(|s| s.to_string()).collect(),
                Duration::from_millis(10),
            ),
            StubFactory { spawned: Vec::new() },
            sink,
            Arc::new(NoDiscovery),
            HistoryBuffer::default().into_shared(),
            Duration::from_millis(200),
        )
    }

    fn sample() -> SensorSample {
        SensorSample::new(20.0, 50.0, 1010.0, 10, true)
    }

    #[test]
    fn test_first_sample_is_silent() {
        let mut sink = quiet_sink();
        sink.expect_notify().never();

        let mut t = tracker(sink, &["10.0.0.1"]);
        t.start();
        t.handle_poll_event(PollEvent::SampleReceived(sample()));

        assert_eq!(t.state(), ConnectionStatus::Connected);
        assert!(t.has_connected_once());
        assert!(t.resolver().is_retired());
        assert_eq!(t.last_good_address(), Some("10.0.0.1"));
        assert_eq!(read_history(t.history()).latest(Channel::Temperature), Some(20.0));
    }

    #[test]
    fn test_loss_fires_once() {
        let mut sink = quiet_sink();
        sink.expect_notify()
            .withf(|n| matches!(n, Notification::ConnectionLost { .. }))
            .times(1)
            .return_const(());

        let mut t = tracker(sink, &["10.0.0.1"]);
        t.start();
        t.handle_poll_event(PollEvent::SampleReceived(sample()));
        for _ in 0..3 {
            t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::Timeout));
        }

        assert_eq!(t.state(), ConnectionStatus::Disconnected);
        assert_eq!(t.stats().connectivity_errors, 3);
        // No re-cascade after the first success
        assert_eq!(t.factory().spawned, vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn test_reconnect_notifies_with_address() {
        let mut sink = quiet_sink();
        let mut seq = mockall::Sequence::new();
        sink.expect_notify()
            .withf(|n| matches!(n, Notification::ConnectionLost { .. }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_notify()
            .with(eq(Notification::Reconnected {
                address: "10.0.0.1".to_string(),
            }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut t = tracker(sink, &["10.0.0.1"]);
        t.start();
        t.handle_poll_event(PollEvent::SampleReceived(sample()));
        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::Status(500)));
        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::Status(500)));
        t.handle_poll_event(PollEvent::SampleReceived(sample()));

        assert_eq!(t.state(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_payload_error_does_not_advance_cascade() {
        let mut sink = quiet_sink();
        sink.expect_notify().never();

        let mut t = tracker(sink, &["a", "b"]);
        t.start();
        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::MissingField("aqi")));

        assert_eq!(t.active_address(), Some("a"));
        assert_eq!(t.state(), ConnectionStatus::Connecting);
        assert_eq!(t.stats().payload_errors, 1);
    }

    #[test]
    fn test_connectivity_error_advances_cascade() {
        let mut t = tracker(quiet_sink(), &["a", "b"]);
        t.start();
        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::Timeout));

        assert_eq!(t.active_address(), Some("b"));
        assert_eq!(t.factory().spawned, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_failed_scan_requests_manual_entry() {
        let mut sink = quiet_sink();
        sink.expect_notify()
            .with(eq(Notification::ManualEntryRequested))
            .times(1)
            .return_const(());

        let mut t = tracker(sink, &[]);
        t.start();
        assert!(t.scan_in_flight());
        assert!(t.pump(Duration::from_secs(2)));

        assert!(!t.scan_in_flight());
        assert_eq!(t.state(), ConnectionStatus::Disconnected);
        assert!(t.active_address().is_none());
    }

    #[test]
    fn test_failed_switch_returns_to_last_good_address() {
        let mut sink = quiet_sink();
        let mut seq = mockall::Sequence::new();
        sink.expect_notify()
            .withf(|n| matches!(n, Notification::ConnectionLost { .. }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_notify()
            .with(eq(Notification::Reconnected {
                address: "10.0.0.1".to_string(),
            }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut t = tracker(sink, &["10.0.0.1"]);
        t.start();
        t.handle_poll_event(PollEvent::SampleReceived(sample()));

        t.handle_discovery_result(Some("10.0.0.9".to_string()));
        assert!(t.switch_pending());
        assert_eq!(t.active_address(), Some("10.0.0.9"));

        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::Timeout));
        assert!(!t.switch_pending());
        assert_eq!(t.state(), ConnectionStatus::Disconnected);
        assert_eq!(t.active_address(), Some("10.0.0.1"));

        t.handle_poll_event(PollEvent::SampleReceived(sample()));
        assert_eq!(t.state(), ConnectionStatus::Connected);
        assert_eq!(
            t.factory().spawned,
            vec!["10.0.0.1".to_string(), "10.0.0.9".to_string(), "10.0.0.1".to_string()]
        );
    }

    #[test]
    fn test_successful_switch_is_silent() {
        let mut sink = quiet_sink();
        sink.expect_notify().never();

        let mut t = tracker(sink, &["10.0.0.1"]);
        t.start();
        t.handle_poll_event(PollEvent::SampleReceived(sample()));
        t.connect_manual("10.0.0.9");
        // Station answered with a bad body; no fallback yet
        t.handle_poll_event(PollEvent::ErrorOccurred(FetchError::MissingField("aqi")));
        assert!(t.switch_pending());
        t.handle_poll_event(PollEvent::SampleReceived(sample()));

        assert!(!t.switch_pending());
        assert_eq!(t.state(), ConnectionStatus::Connected);
        assert_eq!(t.last_good_address(), Some("10.0.0.9"));
    }

    #[test]
    fn test_finished_drops_active_poller() {
        let mut t = tracker(quiet_sink(), &["a"]);
        t.start();
        t.handle_poll_event(PollEvent::Finished);
        assert!(t.active_address().is_none());
    }
}
