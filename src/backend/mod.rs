//! Backend module for station polling
//!
//! This module handles all network work in separate threads to keep the UI
//! responsive. It uses crossbeam channels for thread-safe communication with
//! the frontend.
//!
//! # Architecture
//!
//! The backend runs in its own thread, communicating via channels:
//!
//! - [`BackendCommand`] - Messages sent from UI to backend (search, manual address, shutdown)
//! - [`BackendMessage`] - Messages sent from backend to UI (status, samples, notifications)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`StationBackend`] - Main backend entry point, run on a dedicated thread
//!
//! # Components
//!
//! - [`HttpDeviceClient`] - Fetches and decodes one reading from the station
//! - [`PollerHandle`] - One polling loop running on its own thread
//! - [`AddressResolver`] - Candidate list, scan and manual-entry cascade
//! - [`MdnsDiscovery`] - Network scan for the station
//! - [`ConnectionTracker`] - State machine over poll events
//! - [`BackendWorker`] - Select loop tying commands, poll events and scan results together
//!
//! # Example
//!
//! ```ignore
//! use climavis_rs::backend::StationBackend;
//! use climavis_rs::config::AppConfig;
//!
//! let (backend, frontend) = StationBackend::new(AppConfig::default());
//! std::thread::spawn(move || backend.run());
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::Sample(sample) = msg {
//!         // update readouts
//!     }
//! }
//! ```

pub mod device;
pub mod discovery;
pub mod poller;
pub mod resolver;
pub mod tracker;
pub mod worker;

pub use device::{decode_payload, DeviceClient, FetchError, FetchErrorKind, HttpDeviceClient};
pub use discovery::{MdnsDiscovery, ServiceDiscovery};
pub use poller::{PollEvent, PollTiming, PollerFactory, PollerHandle, ThreadPollerFactory};
pub use resolver::{AddressResolver, CascadePhase, CascadeStep};
pub use tracker::{ConnectionTracker, Notification, NotificationSink};
pub use worker::BackendWorker;

use crate::config::AppConfig;
use crate::history::{HistoryBuffer, SharedHistory};
use crate::types::{ConnectionStatus, SensorSample, SessionStats};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Re-run the network scan, then the manual prompt
    Search,
    /// Poll an address typed by the user
    ConnectTo(String),
    /// The user dismissed the manual address prompt
    ManualEntryCancelled,
    /// Stop the poller and exit the backend loop
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Connection status changed
    ConnectionStatus {
        status: ConnectionStatus,
        address: Option<String>,
    },
    /// Latest reading, for the live readouts and the rain indicator
    Sample(SensorSample),
    /// Transition notification
    Notification(Notification),
    /// One-line status text
    Status(String),
    /// Statistics update
    Stats(SessionStats),
    /// Backend is shutting down
    Shutdown,
}

/// [`NotificationSink`] that forwards everything to the UI channel
///
/// Samples and stats are dropped with a warning when the UI falls behind.
/// Status text, connection changes and notifications wait for room in the
/// queue, since each one marks a transition the UI has to see exactly once.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<BackendMessage>,
}

impl ChannelSink {
    pub fn new(sender: Sender<BackendMessage>) -> Self {
        Self { sender }
    }

    /// Queue a control message, waiting while the UI drains the queue
    fn send_control(&self, message: BackendMessage) {
        // Fails only once the UI side is gone
        if self.sender.send(message).is_err() {
            tracing::debug!("UI receiver closed, control message discarded");
        }
    }

    /// Queue a data message, dropping it if the queue is full
    fn send_data(&self, message: BackendMessage) {
        match self.sender.try_send(message) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!(?message, "UI message queue full, dropping message");
            }
        }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&mut self, notification: Notification) {
        self.send_control(BackendMessage::Notification(notification));
    }

    fn status_message(&mut self, message: String) {
        self.send_control(BackendMessage::Status(message));
    }

    fn connection_status(&mut self, status: ConnectionStatus, address: Option<String>) {
        self.send_control(BackendMessage::ConnectionStatus { status, address });
    }

    fn sample(&mut self, sample: SensorSample) {
        self.send_data(BackendMessage::Sample(sample));
    }

    fn stats(&mut self, stats: SessionStats) {
        self.send_data(BackendMessage::Stats(stats));
    }
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
    /// History written by the backend, read by the plot and the exporter
    pub history: SharedHistory,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        self.receiver.try_iter().collect()
    }

    /// Send a command to the backend without blocking the UI
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.try_send(cmd).is_ok()
    }

    /// Manual restart trigger
    pub fn search(&self) {
        self.send_command(BackendCommand::Search);
    }

    /// Poll a manually entered address
    pub fn connect_to(&self, address: impl Into<String>) {
        self.send_command(BackendCommand::ConnectTo(address.into()));
    }

    pub fn cancel_manual_entry(&self) {
        self.send_command(BackendCommand::ManualEntryCancelled);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.send_command(BackendCommand::Shutdown);
    }
}

/// The station backend that runs in a separate thread
pub struct StationBackend {
    config: AppConfig,
    command_receiver: Receiver<BackendCommand>,
    message_sender: Sender<BackendMessage>,
    history: SharedHistory,
    running: Arc<AtomicBool>,
}

impl StationBackend {
    /// Create a new backend with communication channels and a fresh history
    pub fn new(config: AppConfig) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(64);
        // A sample produces a handful of messages per second, so this absorbs long UI stalls
        let (msg_tx, msg_rx) = bounded(1_024);

        let history =
            HistoryBuffer::new(config.history.graph_capacity, config.history.export_capacity)
                .into_shared();

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            history: Arc::clone(&history),
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
            history,
        };

        (backend, frontend)
    }

    /// Build the real collaborators and run the backend loop until shutdown
    pub fn run(self) {
        let timing = PollTiming::default();

        let client =
            match HttpDeviceClient::new(&self.config.device.endpoint_path, timing.request_timeout) {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!("Failed to create HTTP client: {}", e);
                    let _ = self
                        .message_sender
                        .send(BackendMessage::Status(format!("Error: {}", e)));
                    let _ = self.message_sender.send(BackendMessage::Shutdown);
                    return;
                }
            };

        let shutdown_bound = timing.shutdown_bound();
        let discovery = Arc::new(MdnsDiscovery::new(
            &self.config.discovery.service_type,
            &self.config.discovery.name_filter,
        ));
        let resolver = AddressResolver::new(
            self.config.device.candidate_addresses.clone(),
            self.config.discovery.scan_window(),
        );

        let tracker = ConnectionTracker::new(
            resolver,
            ThreadPollerFactory::new(client, timing),
            ChannelSink::new(self.message_sender.clone()),
            discovery,
            self.history,
            shutdown_bound,
        );

        let mut worker = BackendWorker::new(
            tracker,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// History shared with the frontend
    pub fn history(&self) -> &SharedHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_backend_creation() {
        let mut config = AppConfig::default();
        config.history.graph_capacity = 7;
        let (backend, frontend) = StationBackend::new(config);

        assert!(backend.stop_handle().load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(backend.history(), &frontend.history));
        assert_eq!(crate::history::read_history(&frontend.history).graph_capacity(), 7);
        assert!(frontend.send_command(BackendCommand::Shutdown));
    }

    #[test]
    fn test_frontend_receiver_commands() {
        let (backend, frontend) = StationBackend::new(AppConfig::default());

        frontend.search();
        frontend.connect_to("10.0.0.8");
        frontend.cancel_manual_entry();
        frontend.shutdown();

        let received: Vec<BackendCommand> = backend.command_receiver.try_iter().collect();
        assert_eq!(
            received,
            vec![
                BackendCommand::Search,
                BackendCommand::ConnectTo("10.0.0.8".to_string()),
                BackendCommand::ManualEntryCancelled,
                BackendCommand::Shutdown,
            ]
        );
    }

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (tx, rx) = bounded(8);
        let mut sink = ChannelSink::new(tx);

        sink.connection_status(ConnectionStatus::Connected, Some("10.0.0.1".into()));
        sink.notify(Notification::ManualEntryRequested);
        sink.status_message("hello".into());

        let messages: Vec<BackendMessage> = rx.try_iter().collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1],
            BackendMessage::Notification(Notification::ManualEntryRequested)
        );
    }

    #[test]
    fn test_channel_sink_drops_data_when_full() {
        let (tx, rx) = bounded(1);
        let mut sink = ChannelSink::new(tx);
        sink.stats(SessionStats::default());
        sink.stats(SessionStats::default());
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_channel_sink_delivers_control_after_queue_fills() {
        let (tx, rx) = bounded(2);
        let mut sink = ChannelSink::new(tx);
        sink.sample(SensorSample::new(21.0, 40.0, 1012.0, 30, false));
        sink.stats(SessionStats::default());
        // Queue is full, this one is dropped
        sink.sample(SensorSample::new(22.0, 41.0, 1012.0, 30, false));

        let writer = std::thread::spawn(move || {
            sink.connection_status(ConnectionStatus::Disconnected, None);
            sink.notify(Notification::ConnectionLost {
                reason: "timed out".into(),
            });
        });

        let mut received = Vec::new();
        while received.len() < 4 {
            match rx.recv_timeout(std::time::Duration::from_secs(3)) {
                Ok(message) => received.push(message),
                Err(_) => break,
            }
        }
        writer.join().unwrap();

        assert_eq!(received.len(), 4);
        assert!(matches!(received[0], BackendMessage::Sample(_)));
        assert!(matches!(received[1], BackendMessage::Stats(_)));
        assert_eq!(
            received[2],
            BackendMessage::ConnectionStatus {
                status: ConnectionStatus::Disconnected,
                address: None,
            }
        );
        assert_eq!(
            received[3],
            BackendMessage::Notification(Notification::ConnectionLost {
                reason: "timed out".into(),
            })
        );
    }
}
