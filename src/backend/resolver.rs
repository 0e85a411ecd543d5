//! Initial-connection address cascade
//!
//! Before the first sample ever arrives, the station address is found by
//! trying three strategies in strict order:
//!
//! 1. every configured candidate address, front to back, once each
//! 2. one network scan with a fixed window
//! 3. one manual prompt
//!
//! The resolver only decides *what to try next*; starting pollers, running
//! the scan and showing the prompt are the tracker's job. Once the first
//! connection succeeds the tracker calls [`AddressResolver::retire`] and the
//! cascade is never consulted for failures again. An explicit search request
//! ([`AddressResolver::restart_search`]) re-enters the scan and prompt
//! stages at any time.

use std::time::Duration;

/// Where the cascade currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    /// Probing the configured candidate list
    StaticList,
    /// Waiting for a network scan to return
    Scanning,
    /// Probing the address the scan returned
    ScanCandidate,
    /// Waiting for the user to type an address
    AwaitingManual,
    /// Probing a manually entered address
    ManualCandidate,
    /// Nothing left to try until the user searches again
    Exhausted,
}

/// Next action the tracker must take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    /// Poll this address
    Probe(String),
    /// Run a network scan for at most this long
    Scan(Duration),
    /// Ask the user for an address
    Prompt,
    /// Give up and wait for a manual restart
    Exhausted,
}

/// Candidate address cascade for the initial connection
#[derive(Debug, Clone)]
pub struct AddressResolver {
    candidates: Vec<String>,
    cursor: usize,
    phase: CascadePhase,
    scan_window: Duration,
    retired: bool,
}

impl AddressResolver {
    pub fn new(candidates: Vec<String>, scan_window: Duration) -> Self {
        Self {
            candidates,
            cursor: 0,
            phase: CascadePhase::StaticList,
            scan_window,
            retired: false,
        }
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn scan_window(&self) -> Duration {
        self.scan_window
    }

    /// Advance the cascade after the current attempt failed (or at startup)
    ///
    /// Each static candidate is handed out exactly once. A scan or prompt that
    /// is still pending is reported again rather than skipped.
    pub fn next_step(&mut self) -> CascadeStep {
        match self.phase {
            CascadePhase::StaticList => {
                if let Some(address) = self.candidates.get(self.cursor) {
                    self.cursor += 1;
                    CascadeStep::Probe(address.clone())
                } else {
                    self.phase = CascadePhase::Scanning;
                    CascadeStep::Scan(self.scan_window)
                }
            }
            CascadePhase::Scanning => CascadeStep::Scan(self.scan_window),
            CascadePhase::ScanCandidate | CascadePhase::AwaitingManual => {
                self.phase = CascadePhase::AwaitingManual;
                CascadeStep::Prompt
            }
            CascadePhase::ManualCandidate | CascadePhase::Exhausted => {
                self.phase = CascadePhase::Exhausted;
                CascadeStep::Exhausted
            }
        }
    }

    /// Feed the result of a network scan
    pub fn on_scan_result(&mut self, found: Option<String>) -> CascadeStep {
        match found {
            Some(address) => {
                self.phase = CascadePhase::ScanCandidate;
                CascadeStep::Probe(address)
            }
            None => {
                self.phase = CascadePhase::AwaitingManual;
                CascadeStep::Prompt
            }
        }
    }

    /// Feed an address typed by the user
    ///
    /// The address is probed but never added to the candidate list.
    pub fn on_manual_entry(&mut self, address: &str) -> CascadeStep {
        self.phase = CascadePhase::ManualCandidate;
        CascadeStep::Probe(address.trim().to_string())
    }

    /// The user dismissed the prompt
    pub fn on_manual_cancelled(&mut self) {
        self.phase = CascadePhase::Exhausted;
    }

    /// Manual restart trigger: scan again, then prompt again
    pub fn restart_search(&mut self) -> CascadeStep {
        self.phase = CascadePhase::Scanning;
        CascadeStep::Scan(self.scan_window)
    }

    /// Stop using the cascade for failures; called on the first connection
    pub fn retire(&mut self) {
        if !self.retired {
            tracing::debug!(phase = ?self.phase, "Address cascade retired");
        }
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}
