//! Station polling loop
//!
//! One poller thread is bound to one address. Each iteration fetches a
//! reading and reports the outcome as a [`PollEvent`] over a crossbeam
//! channel:
//!
//! - success: [`PollEvent::SampleReceived`], then wait `success_interval`
//! - failure: [`PollEvent::ErrorOccurred`], then wait `failure_interval`
//!
//! The loop never exits because of a bad response. It stops only when its
//! stop signal fires (checked at the top of every iteration and during the
//! waits) or when nobody listens to its events anymore, and it always ends
//! with [`PollEvent::Finished`].
//!
//! An in-flight request is never aborted; a stop takes effect once it
//! returns or times out. [`PollerHandle::stop_and_wait`] therefore waits at
//! most [`PollTiming::shutdown_bound`].

use crate::backend::device::{DeviceClient, FetchError};
use crate::types::SensorSample;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Events emitted by a poller, delivered in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A reading was fetched and decoded
    SampleReceived(SensorSample),
    /// A poll failed; the loop keeps going
    ErrorOccurred(FetchError),
    /// The loop has exited; no further events follow
    Finished,
}

/// Request timeout and inter-attempt pauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTiming {
    /// Upper bound for one HTTP request
    pub request_timeout: Duration,
    /// Pause after a successful poll
    pub success_interval: Duration,
    /// Pause after a failed poll
    pub failure_interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(2_500),
            success_interval: Duration::from_secs(1),
            failure_interval: Duration::from_secs(5),
        }
    }
}

impl PollTiming {
    /// Longest time a poller may take to acknowledge a stop request
    pub fn shutdown_bound(&self) -> Duration {
        self.request_timeout
            + self.success_interval.max(self.failure_interval)
            + Duration::from_secs(1)
    }
}

fn stop_requested(stop: &Receiver<()>) -> bool {
    match stop.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// Run the polling loop on the current thread until stopped
pub fn run_poll_loop<C: DeviceClient + ?Sized>(
    client: &C,
    address: &str,
    timing: &PollTiming,
    stop: &Receiver<()>,
    events: &Sender<PollEvent>,
) {
    tracing::info!(address, "Poller started");

    while !stop_requested(stop) {
        let (event, pause) = match client.fetch(address) {
            Ok(sample) => {
                tracing::trace!(address, ?sample, "Sample received");
                (PollEvent::SampleReceived(sample), timing.success_interval)
            }
            Err(err) => {
                tracing::warn!(address, kind = err.kind().as_str(), "Poll failed: {}", err);
                (PollEvent::ErrorOccurred(err), timing.failure_interval)
            }
        };

        if events.send(event).is_err() {
            tracing::debug!(address, "Event receiver dropped, stopping poller");
            break;
        }

        match stop.recv_timeout(pause) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    let _ = events.send(PollEvent::Finished);
    tracing::info!(address, "Poller stopped");
}

/// Owner-side handle of one running poller
///
/// Dropping the handle requests a stop without waiting for it.
pub struct PollerHandle {
    address: String,
    stop_tx: Sender<()>,
    events: Receiver<PollEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Spawn a poller thread against `address`
    pub fn spawn<C>(client: C, address: &str, timing: PollTiming) -> Self
    where
        C: DeviceClient + 'static,
    {
        let (stop_tx, stop_rx) = bounded(1);
        let (event_tx, event_rx) = unbounded();
        let thread_address = address.to_string();

        let spawned = std::thread::Builder::new()
            .name("station-poller".to_string())
            .spawn(move || {
                run_poll_loop(&client, &thread_address, &timing, &stop_rx, &event_tx);
            });

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Receiver sees a disconnected channel and treats the poller as finished
                tracing::error!("Failed to spawn poller thread: {}", e);
                None
            }
        };

        Self::from_parts(address, stop_tx, event_rx, thread)
    }

    /// Assemble a handle from an externally managed loop
    pub fn from_parts(
        address: &str,
        stop_tx: Sender<()>,
        events: Receiver<PollEvent>,
        thread: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            address: address.to_string(),
            stop_tx,
            events,
            thread,
        }
    }

    /// Address this poller is bound to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Event stream of this poller
    pub fn events(&self) -> &Receiver<PollEvent> {
        &self.events
    }

    /// Ask the loop to exit at its next check
    pub fn request_stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Stop the loop and wait up to `bound` for its [`PollEvent::Finished`]
    ///
    /// Events that arrive in the meantime are discarded. Returns `false` if
    /// the poller did not acknowledge in time; its thread is then detached.
    pub fn stop_and_wait(mut self, bound: Duration) -> bool {
        self.request_stop();

        let deadline = Instant::now() + bound;
        let acknowledged = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(PollEvent::Finished) => break true,
                Ok(_) => continue,
                Err(RecvTimeoutError::Disconnected) => break true,
                Err(RecvTimeoutError::Timeout) => break false,
            }
        };

        if acknowledged {
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    tracing::error!(address = %self.address, "Poller thread panicked");
                }
            }
        } else {
            tracing::warn!(
                address = %self.address,
                "Poller did not stop within {:?}, detaching it",
                bound
            );
        }

        acknowledged
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.request_stop();
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("address", &self.address)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// Creates pollers for the connection tracker
pub trait PollerFactory: Send {
    /// Start a new poller against `address`
    fn spawn(&mut self, address: &str) -> PollerHandle;
}

/// [`PollerFactory`] that runs each poller on its own thread
#[derive(Debug, Clone)]
pub struct ThreadPollerFactory<C> {
    client: C,
    timing: PollTiming,
}

impl<C> ThreadPollerFactory<C>
where
    C: DeviceClient + Clone + 'static,
{
    /// Create a factory sharing `client` between pollers
    pub fn new(client: C, timing: PollTiming) -> Self {
        Self { client, timing }
    }

    /// Timing applied to spawned pollers
    pub fn timing(&self) -> &PollTiming {
        &self.timing
    }
}

impl<C> PollerFactory for ThreadPollerFactory<C>
where
    C: DeviceClient + Clone + 'static,
{
    fn spawn(&mut self, address: &str) -> PollerHandle {
        PollerHandle::spawn(self.client.clone(), address, self.timing.clone())
    }
}
