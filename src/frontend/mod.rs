//! Frontend module for egui UI
//!
//! This module provides the dashboard using eframe/egui. It receives
//! messages from the backend through crossbeam channels each frame and reads
//! the shared history directly for the graph and the export.
//!
//! # Layout
//!
//! - top: one readout card per channel plus the rain LED
//! - center: live temperature and humidity graph
//! - bottom: polled address, Search IP, Export and Exit buttons, status bar
//!
//! # Submodules
//!
//! - `dialogs` - Manual address prompt and connection-lost modal
//! - `plot` - Graph rendering with egui_plot
//! - `state` - Backend-derived state and UI actions
//! - `status_bar` - Connection, stats and status message line
//! - `widgets` - LED, sensor card, status indicator

pub mod dialogs;
mod plot;
pub mod state;
mod status_bar;
pub mod widgets;

pub use plot::PlotView;
pub use state::{AppAction, DashboardState, UiSignal};
pub use widgets::*;

use dialogs::{
    show_dialog, ConnectionLostAction, ConnectionLostContext, ConnectionLostDialog,
    ConnectionLostState, ManualAddressAction, ManualAddressContext, ManualAddressDialog,
    ManualAddressState,
};

use crate::backend::FrontendReceiver;
use crate::config::{AppConfig, AppState};
use crate::export::{default_export_name, ExportCoordinator, ExportFormat, ExportOutcome};
use crate::history::read_history;
use crate::types::{Channel, ConnectionStatus};
use egui::{Color32, RichText};
use std::path::PathBuf;
use std::time::Duration;

/// Repaint cadence while idle; samples arrive at most once per second
const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Main application state for the weather dashboard
pub struct ClimaVisApp {
    // === Communication ===
    frontend: FrontendReceiver,
    exporter: ExportCoordinator,

    // === Shared State ===
    app_state: AppState,
    dashboard: DashboardState,
    plot: PlotView,

    // === Dialogs ===
    manual_address_open: bool,
    manual_address_state: ManualAddressState,
    connection_lost_open: bool,
    connection_lost_state: ConnectionLostState,
}

impl ClimaVisApp {
    /// Create a new application instance
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        let exporter = ExportCoordinator::new(frontend.history.clone());
        let plot = PlotView::from_config(&config.ui);

        Self {
            frontend,
            exporter,
            app_state,
            dashboard: DashboardState::default(),
            plot,
            manual_address_open: false,
            manual_address_state: ManualAddressState::default(),
            connection_lost_open: false,
            connection_lost_state: ConnectionLostState::default(),
        }
    }

    fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            match self.dashboard.apply(msg) {
                Some(UiSignal::OpenManualEntry) => {
                    self.manual_address_open = true;
                }
                Some(UiSignal::ShowConnectionLost(reason)) => {
                    self.connection_lost_state.reason = reason;
                    self.connection_lost_open = true;
                }
                Some(UiSignal::DismissConnectionLost) => {
                    self.connection_lost_open = false;
                    self.connection_lost_state = ConnectionLostState::default();
                }
                None => {}
            }
        }

        had_messages
    }

    fn handle_action(&mut self, ctx: &egui::Context, action: AppAction) {
        match action {
            AppAction::Search => {
                self.frontend.search();
            }
            AppAction::ConnectTo(address) => {
                self.frontend.connect_to(address);
            }
            AppAction::CancelManualEntry => {
                self.frontend.cancel_manual_entry();
            }
            AppAction::Export => {
                self.export();
            }
            AppAction::Exit => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn export(&mut self) {
        let last_dir = self.app_state.last_export_dir.clone();
        let mut chooser = move || -> Option<PathBuf> {
            let mut dialog = rfd::FileDialog::new()
                .set_title("Export sensor data")
                .add_filter(ExportFormat::Xlsx.display_name(), &[ExportFormat::Xlsx.extension()])
                .add_filter(ExportFormat::Csv.display_name(), &[ExportFormat::Csv.extension()])
                .set_file_name(default_export_name(chrono::Local::now().naive_local()));

            if let Some(dir) = &last_dir {
                dialog = dialog.set_directory(dir);
            }
            dialog.save_file()
        };
        let outcome = self.exporter.export_with(&mut chooser);

        if let ExportOutcome::Success { path, .. } = &outcome {
            self.app_state.record_export(path);
        }
        self.dashboard.status_message = Some(outcome.status_message());
    }

    // ==================== Panels ====================

    fn render_readouts(&self, ui: &mut egui::Ui) {
        let history = read_history(&self.frontend.history);
        let latest: Vec<(Channel, Option<f64>)> = Channel::ALL
            .iter()
            .map(|&channel| (channel, history.latest(channel)))
            .collect();
        drop(history);

        ui.horizontal_wrapped(|ui| {
            for (channel, value) in latest {
                ui.add(SensorCard::new(channel, value));
            }

            egui::Frame::group(ui.style()).inner_margin(8.0).show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new("RAIN").small());
                    ui.add(Led::new(self.dashboard.raining()));
                });
            });
        });
    }

    fn render_controls(&self, ui: &mut egui::Ui) -> Vec<AppAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            let mut address = self.dashboard.address_display().to_string();
            ui.add_enabled(
                false,
                egui::TextEdit::singleline(&mut address).desired_width(180.0),
            );

            if ui
                .button("Search IP")
                .on_hover_text("Scan the network for the station")
                .clicked()
            {
                actions.push(AppAction::Search);
            }

            if ui
                .button("Export")
                .on_hover_text("Save the recorded readings as .xlsx or .csv")
                .clicked()
            {
                actions.push(AppAction::Export);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Exit").clicked() {
                    actions.push(AppAction::Exit);
                }
            });
        });

        actions
    }

    fn render_dialogs(&mut self, ctx: &egui::Context) -> Vec<AppAction> {
        let mut actions = Vec::new();

        let manual_ctx = ManualAddressContext {
            last_address: self.dashboard.address.as_deref(),
        };
        if let Some(action) = show_dialog::<ManualAddressDialog>(
            ctx,
            &mut self.manual_address_open,
            &mut self.manual_address_state,
            manual_ctx,
        ) {
            actions.push(match action {
                ManualAddressAction::Connect(address) => AppAction::ConnectTo(address),
                ManualAddressAction::Cancel => AppAction::CancelManualEntry,
            });
        }

        match show_dialog::<ConnectionLostDialog>(
            ctx,
            &mut self.connection_lost_open,
            &mut self.connection_lost_state,
            ConnectionLostContext,
        ) {
            Some(ConnectionLostAction::Acknowledge) => {
                tracing::debug!("Connection lost dialog acknowledged");
            }
            None => {}
        }

        actions
    }
}

impl eframe::App for ClimaVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.process_backend_messages() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }

        let mut actions = Vec::new();

        egui::TopBottomPanel::top("readouts").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("ClimaVis");
                if self.dashboard.connection_status != ConnectionStatus::Connected {
                    ui.colored_label(Color32::GRAY, RichText::new("(no live data)").small());
                }
            });
            self.render_readouts(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            status_bar::render_status_bar(ui, &self.dashboard);
        });

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            actions.extend(self.render_controls(ui));
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot.render(ui, &self.frontend.history);
        });

        actions.extend(self.render_dialogs(ctx));

        for action in actions {
            self.handle_action(ctx, action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();

        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
