//! Status bar panel: connection, session stats and the last status message.

use egui::{Color32, RichText, Ui};

use crate::frontend::state::DashboardState;
use crate::frontend::widgets::StatusIndicator;

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, state: &DashboardState) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + address ===
        let mut indicator = StatusIndicator::for_status(state.connection_status);
        if let Some(address) = &state.address {
            indicator = indicator.with_tooltip(address.clone());
        }
        ui.add(indicator);

        ui.separator();

        // === Sample count ===
        let stats = &state.stats;
        ui.label(RichText::new(format!("Samples: {}", stats.samples_received)).small());

        ui.separator();

        // === Error count ===
        let error_color = if stats.failed_polls() > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            error_color,
            RichText::new(format!(
                "Errors: {} ({} payload)",
                stats.failed_polls(),
                stats.payload_errors
            ))
            .small(),
        )
        .on_hover_text(format!("Success rate: {:.1}%", stats.success_rate()));

        // === Status message (right-aligned) ===
        if let Some(message) = &state.status_message {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let color = if message.starts_with("Error") {
                    Color32::RED
                } else {
                    ui.visuals().text_color()
                };
                ui.colored_label(color, RichText::new(message).small());
            });
        }
    });
}
