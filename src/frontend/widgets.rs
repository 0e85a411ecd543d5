//! Custom widgets for the ClimaVis-RS UI
//!
//! # Widgets
//!
//! - [`StatusIndicator`] - Colored status dot with label
//! - [`Led`] - Round indicator lamp (rain sensor)
//! - [`SensorCard`] - Framed readout of one sensor channel

use crate::types::{Channel, ConnectionStatus};
use egui::{Color32, Response, RichText, Ui, Widget};

/// Lit rain LED
pub const LED_ON: Color32 = Color32::from_rgb(50, 205, 50);
/// Dark rain LED
pub const LED_OFF: Color32 = Color32::from_rgb(200, 40, 40);

/// A widget that displays a colored status indicator
pub struct StatusIndicator {
    color: Color32,
    label: String,
    tooltip: Option<String>,
}

impl StatusIndicator {
    /// Create a new status indicator with the given color and label
    pub fn new(color: Color32, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
            tooltip: None,
        }
    }

    /// Indicator matching a connection status
    pub fn for_status(status: ConnectionStatus) -> Self {
        let color = match status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
        };
        Self::new(color, status.to_string())
    }

    /// Add a tooltip to the indicator
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        let response = ui
            .horizontal(|ui| {
                ui.colored_label(self.color, "●");
                ui.label(RichText::new(&self.label).small());
            })
            .response;

        if let Some(tooltip) = self.tooltip {
            response.on_hover_text(tooltip)
        } else {
            response
        }
    }
}

/// Round indicator lamp
pub struct Led {
    on: bool,
    diameter: f32,
}

impl Led {
    pub fn new(on: bool) -> Self {
        Self { on, diameter: 22.0 }
    }

    pub fn with_diameter(mut self, diameter: f32) -> Self {
        self.diameter = diameter;
        self
    }

    /// Fill color for the given state
    pub fn color(on: bool) -> Color32 {
        if on {
            LED_ON
        } else {
            LED_OFF
        }
    }
}

impl Widget for Led {
    fn ui(self, ui: &mut Ui) -> Response {
        let size = egui::vec2(self.diameter, self.diameter);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::hover());

        if ui.is_rect_visible(rect) {
            let radius = self.diameter / 2.0;
            ui.painter()
                .circle_filled(rect.center(), radius, Self::color(self.on));
            ui.painter().circle_stroke(
                rect.center(),
                radius,
                egui::Stroke::new(1.5, Color32::DARK_GRAY),
            );
        }

        response
    }
}

/// Framed readout of one channel's latest value
pub struct SensorCard {
    channel: Channel,
    value: Option<f64>,
    width: f32,
}

impl SensorCard {
    pub fn new(channel: Channel, value: Option<f64>) -> Self {
        Self {
            channel,
            value,
            width: 150.0,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Text shown as the value; a dash before the first sample
    pub fn value_text(&self) -> String {
        self.value
            .map(|v| self.channel.format_value(v))
            .unwrap_or_else(|| "--".to_string())
    }
}

impl Widget for SensorCard {
    fn ui(self, ui: &mut Ui) -> Response {
        let text = self.value_text();
        egui::Frame::group(ui.style())
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.set_width(self.width);
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(self.channel.display_name().to_uppercase()).small());
                    ui.label(RichText::new(text).heading().strong());
                });
            })
            .response
    }
}
