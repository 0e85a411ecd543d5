//! Frontend state and actions
//!
//! [`DashboardState`] is everything the UI shows that comes from the backend.
//! It is updated only by [`DashboardState::apply`], which returns a
//! [`UiSignal`] when a message needs more than a repaint (opening or closing
//! a dialog). Widgets return [`AppAction`]s instead of talking to the
//! backend directly.

use crate::backend::{BackendMessage, Notification};
use crate::types::{ConnectionStatus, SensorSample, SessionStats};

/// Backend-derived state rendered by the dashboard
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub connection_status: ConnectionStatus,
    /// Address being polled, or the last one that was
    pub address: Option<String>,
    /// Most recent reading; drives the readouts and the rain LED
    pub latest: Option<SensorSample>,
    pub status_message: Option<String>,
    pub stats: SessionStats,
    pub backend_stopped: bool,
}

/// Side effects of a backend message beyond updating [`DashboardState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiSignal {
    OpenManualEntry,
    ShowConnectionLost(String),
    DismissConnectionLost,
}

impl DashboardState {
    pub fn apply(&mut self, message: BackendMessage) -> Option<UiSignal> {
        match message {
            BackendMessage::ConnectionStatus { status, address } => {
                self.connection_status = status;
                if address.is_some() {
                    self.address = address;
                }
                None
            }
            BackendMessage::Sample(sample) => {
                self.latest = Some(sample);
                None
            }
            BackendMessage::Status(message) => {
                self.status_message = Some(message);
                None
            }
            BackendMessage::Stats(stats) => {
                self.stats = stats;
                None
            }
            BackendMessage::Notification(notification) => match notification {
                Notification::Reconnected { address } => {
                    self.status_message = Some(format!("Reconnected to {}", address));
                    Some(UiSignal::DismissConnectionLost)
                }
                Notification::ConnectionLost { reason } => {
                    self.status_message = Some("Connection lost".to_string());
                    Some(UiSignal::ShowConnectionLost(reason))
                }
                Notification::ManualEntryRequested => Some(UiSignal::OpenManualEntry),
            },
            BackendMessage::Shutdown => {
                tracing::info!("Backend shutdown received");
                self.backend_stopped = true;
                self.connection_status = ConnectionStatus::Disconnected;
                None
            }
        }
    }

    /// Text of the read-only address field
    pub fn address_display(&self) -> &str {
        self.address.as_deref().unwrap_or("STATION IP")
    }

    /// Whether the rain LED is lit
    pub fn raining(&self) -> bool {
        self.latest.map(|s| s.rain_detected).unwrap_or(false)
    }
}

/// Actions the UI can emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Manual restart trigger ("Search IP")
    Search,
    ConnectTo(String),
    CancelManualEntry,
    Export,
    Exit,
}
