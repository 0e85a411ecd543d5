//! # ClimaVis-RS: Weather Station Dashboard
//!
//! A desktop dashboard for a small weather station that serves its readings
//! as JSON over HTTP. The station is polled once per second from a background
//! thread; the UI shows the latest readings, a live graph and exports the
//! recorded history to a spreadsheet.
//!
//! ## Architecture
//!
//! - **Backend**: Locates the station (known addresses, mDNS scan, manual
//!   entry), runs the poller and tracks the connection state
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot for graphs
//! - **History**: Bounded sample buffers shared between both sides
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Example
//!
//! ```ignore
//! use climavis_rs::{
//!     backend::StationBackend,
//!     config::{AppConfig, AppState},
//!     frontend::ClimaVisApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let app_state = AppState::load_or_default();
//!
//!     let (backend, frontend_receiver) = StationBackend::new(config.clone());
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "ClimaVis",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| {
//!             Ok(Box::new(ClimaVisApp::new(cc, frontend_receiver, config, app_state)))
//!         }),
//!     )
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod frontend;
pub mod history;
pub mod types;

// Re-export commonly used types
pub use app::ClimaVisApp;
pub use backend::{BackendCommand, BackendMessage, StationBackend};
pub use config::{AppConfig, AppState};
pub use error::{ClimaVisError, Result};
pub use history::{HistoryBuffer, SharedHistory};
pub use types::{Channel, ConnectionStatus, SensorSample};
