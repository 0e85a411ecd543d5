//! Live graph of the history graph window
//!
//! Temperature and humidity are drawn against the sample index. Points are
//! copied out of the shared history under one read lock, then drawn without
//! holding it.

use crate::config::UiConfig;
use crate::history::{read_history, SharedHistory};
use crate::types::Channel;
use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};

/// Channels on the live graph and their line colors
pub const GRAPHED_CHANNELS: [(Channel, Color32); 2] = [
    (Channel::Temperature, Color32::from_rgb(220, 50, 50)),
    (Channel::Humidity, Color32::from_rgb(50, 100, 230)),
];

/// Plot configuration
#[derive(Debug, Clone)]
pub struct PlotView {
    pub show_grid: bool,
    pub show_legend: bool,
    pub line_width: f32,
}

impl Default for PlotView {
    fn default() -> Self {
        Self::from_config(&UiConfig::default())
    }
}

impl PlotView {
    pub fn from_config(config: &UiConfig) -> Self {
        Self {
            show_grid: config.show_grid,
            show_legend: config.show_legend,
            line_width: config.line_width,
        }
    }

    /// Copy the series to draw
    pub fn collect_series(history: &SharedHistory) -> Vec<(Channel, Color32, Vec<[f64; 2]>)> {
        let history = read_history(history);
        GRAPHED_CHANNELS
            .iter()
            .map(|&(channel, color)| (channel, color, history.plot_points(channel)))
            .collect()
    }

    pub fn render(&self, ui: &mut Ui, history: &SharedHistory) {
        let series = Self::collect_series(history);

        let mut plot = Plot::new("live_sensor_plot")
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_axes(true)
            .show_grid(self.show_grid)
            .x_axis_label("Sample");

        if self.show_legend {
            plot = plot.legend(Legend::default().position(Corner::LeftTop));
        }

        plot.show(ui, |plot_ui| {
            for (channel, color, points) in series {
                if points.is_empty() {
                    continue;
                }
                let line = Line::new(channel.display_name(), PlotPoints::from(points))
                    .color(color)
                    .width(self.line_width);
                plot_ui.line(line);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{write_history, HistoryBuffer};
    use crate::types::SensorSample;

    #[test]
    fn test_collect_series_uses_graph_window() {
        let history = HistoryBuffer::new(2, 10).into_shared();
        for t in [10.0, 11.0, 12.0] {
            write_history(&history).append(&SensorSample::new(t, t * 2.0, 1000.0, 5, false));
        }

        let series = PlotView::collect_series(&history);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, Channel::Temperature);
        assert_eq!(series[0].2, vec![[1.0, 11.0], [2.0, 12.0]]);
        assert_eq!(series[1].2, vec![[1.0, 22.0], [2.0, 24.0]]);
    }
}
