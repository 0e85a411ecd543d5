//! Backend Worker Thread Implementation
//!
//! This module contains the main worker loop that runs in a separate thread.
//! It owns the [`ConnectionTracker`] and multiplexes three sources with
//! `crossbeam_channel::select!`:
//!
//! - **UI commands**: search, manual address, prompt cancelled, shutdown
//! - **Poll events**: from the one active poller, if any
//! - **Scan results**: from the one in-flight discovery thread, if any
//!
//! On shutdown the active poller is stopped with a bounded wait before the
//! final [`BackendMessage::Shutdown`] is sent.

use crate::backend::poller::{PollEvent, PollerFactory};
use crate::backend::tracker::{ConnectionTracker, NotificationSink};
use crate::backend::{BackendCommand, BackendMessage};
use crossbeam_channel::{never, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the loop wakes up to check the running flag when idle
const IDLE_TICK: Duration = Duration::from_millis(100);

/// The backend worker that drives the connection tracker
pub struct BackendWorker<F: PollerFactory, S: NotificationSink> {
    tracker: ConnectionTracker<F, S>,
    command_rx: Receiver<BackendCommand>,
    message_tx: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
}

impl<F: PollerFactory, S: NotificationSink> BackendWorker<F, S> {
    pub fn new(
        tracker: ConnectionTracker<F, S>,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tracker,
            command_rx,
            message_tx,
            running,
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker<F, S> {
        &self.tracker
    }

    /// Run the main worker loop until shutdown
    pub fn run(&mut self) {
        tracing::info!("Backend worker started");
        self.tracker.start();

        let commands = self.command_rx.clone();

        while self.running.load(Ordering::SeqCst) {
            let events = self.tracker.event_receiver().unwrap_or_else(never);
            let discovery = self.tracker.discovery_receiver().clone();

            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        tracing::debug!("Command channel closed");
                        self.running.store(false, Ordering::SeqCst);
                    }
                },
                recv(events) -> event => {
                    // A poller whose channel closed without Finished is gone all the same
                    self.tracker
                        .handle_poll_event(event.unwrap_or(PollEvent::Finished));
                }
                recv(discovery) -> found => {
                    if let Ok(found) = found {
                        self.tracker.handle_discovery_result(found);
                    }
                }
                default(IDLE_TICK) => {}
            }
        }

        // Cleanup
        self.tracker.stop();

        let _ = self.message_tx.try_send(BackendMessage::Shutdown);
        tracing::info!("Backend worker stopped");
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand) {
        tracing::debug!(?cmd, "Backend command");
        match cmd {
            BackendCommand::Search => self.tracker.search(),
            BackendCommand::ConnectTo(address) => self.tracker.connect_manual(&address),
            BackendCommand::ManualEntryCancelled => self.tracker.manual_entry_cancelled(),
            BackendCommand::Shutdown => self.running.store(false, Ordering::SeqCst),
        }
    }
}
