//! ClimaVis - Main Entry Point
//!
//! Desktop dashboard for an HTTP weather station.

use climavis_rs::{
    backend::{BackendCommand, PollTiming, StationBackend},
    config::{app_data_dir, AppConfig, AppState},
    frontend::ClimaVisApp,
};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix inside the app data directory
const LOG_FILE_PREFIX: &str = "climavis.log";

fn main() -> eframe::Result<()> {
    // File logging is optional; keep the guard alive until exit
    let (file_layer, _log_guard) = match app_data_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,climavis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting ClimaVis");

    let config = AppConfig::load_or_default();
    let app_state = AppState::load_or_default();

    let (backend, frontend_receiver) = StationBackend::new(config.clone());
    let command_sender = frontend_receiver.command_sender.clone();
    let backend_running = backend.stop_handle();
    let backend_handle = std::thread::Builder::new()
        .name("station-backend".to_string())
        .spawn(move || backend.run());

    let backend_handle = match backend_handle {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("Failed to start backend thread: {}", e);
            None
        }
    };

    // Configure eframe options
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 640.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("ClimaVis"),
        ..Default::default()
    };

    // Run the eframe application
    let result = eframe::run_native(
        "ClimaVis",
        native_options,
        Box::new(|cc| {
            if app_state.ui_preferences.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(ClimaVisApp::new(
                cc,
                frontend_receiver,
                config,
                app_state,
            )))
        }),
    );

    // Signal backend to stop and wait for it, bounded by one poll cycle
    tracing::info!("Shutting down...");
    let _ = command_sender.try_send(BackendCommand::Shutdown);
    backend_running.store(false, Ordering::SeqCst);

    if let Some(handle) = backend_handle {
        let deadline =
            Instant::now() + PollTiming::default().shutdown_bound() + Duration::from_secs(1);
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                tracing::error!("Backend thread panicked");
            }
        } else {
            tracing::warn!("Backend did not stop in time, detaching");
        }
    }

    result
}
