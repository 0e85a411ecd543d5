//! Core data types for ClimaVis-RS
//!
//! This module contains the fundamental data structures shared by the
//! backend, the history buffers and the UI.
//!
//! # Main Types
//!
//! - [`SensorSample`] - One reading decoded from the station
//! - [`Channel`] - The four numeric sensor channels that are graphed and exported
//! - [`ConnectionStatus`] - Connection state of the station link
//! - [`SessionStats`] - Counters for received samples and failed polls

use serde::{Deserialize, Serialize};

/// One polled reading from the weather station
///
/// Produced by decoding a single HTTP response body and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Barometric pressure in mbar
    pub pressure: f64,
    /// Air quality index
    pub air_quality_index: i64,
    /// Whether the rain sensor currently detects rain
    pub rain_detected: bool,
}

impl SensorSample {
    /// Create a new sample
    pub fn new(
        temperature: f64,
        humidity: f64,
        pressure: f64,
        air_quality_index: i64,
        rain_detected: bool,
    ) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            air_quality_index,
            rain_detected,
        }
    }

    /// Numeric value of one buffered channel
    #[inline]
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
            Channel::AirQuality => self.air_quality_index as f64,
        }
    }
}

/// A numeric sensor channel kept in the history buffers
///
/// Rain is deliberately not a channel: it only drives the live indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    Pressure,
    AirQuality,
}

impl Channel {
    /// Number of buffered channels
    pub const COUNT: usize = 4;

    /// All channels in export column order
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::Pressure,
        Channel::AirQuality,
    ];

    /// Position of this channel in per-channel arrays and export rows
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::Humidity => 1,
            Channel::Pressure => 2,
            Channel::AirQuality => 3,
        }
    }

    /// Get display name for this channel
    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::Pressure => "Pressure",
            Channel::AirQuality => "AQI",
        }
    }

    /// Column header used in exported documents
    pub fn export_header(&self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature (°C)",
            Channel::Humidity => "Humidity (%)",
            Channel::Pressure => "Pressure (mbar)",
            Channel::AirQuality => "AQI",
        }
    }

    /// Format a value the way the dashboard readouts show it
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Channel::Temperature => format!("{:.1}°C", value),
            Channel::Humidity => format!("{:.1}%", value),
            Channel::Pressure => format!("{:.1} mbar", value),
            Channel::AirQuality => format!("{}", value.round() as i64),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Represents the connection status to the weather station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No working link (never connected, cascade exhausted, or link lost)
    #[default]
    Disconnected,
    /// Polling a candidate address that has not answered yet
    Connecting,
    /// The last poll returned a sample
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

/// Counters for the current application session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Number of samples received
    pub samples_received: u64,
    /// Polls that failed before a usable HTTP response arrived
    pub connectivity_errors: u64,
    /// Polls whose response lacked or mangled expected fields
    pub payload_errors: u64,
}

impl SessionStats {
    /// Total failed polls
    pub fn failed_polls(&self) -> u64 {
        self.connectivity_errors + self.payload_errors
    }

    /// Calculate the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.samples_received + self.failed_polls();
        if total == 0 {
            100.0
        } else {
            (self.samples_received as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_matches_index() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_sample_channel_values() {
        let sample = SensorSample::new(21.5, 48.0, 1012.3, 17, true);
        assert_eq!(sample.value(Channel::Temperature), 21.5);
        assert_eq!(sample.value(Channel::Humidity), 48.0);
        assert_eq!(sample.value(Channel::Pressure), 1012.3);
        assert_eq!(sample.value(Channel::AirQuality), 17.0);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(Channel::Temperature.format_value(21.46), "21.5°C");
        assert_eq!(Channel::Humidity.format_value(50.0), "50.0%");
        assert_eq!(Channel::Pressure.format_value(1010.04), "1010.0 mbar");
        assert_eq!(Channel::AirQuality.format_value(12.0), "12");
    }

    #[test]
    fn test_success_rate() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.success_rate(), 100.0);

        stats.samples_received = 3;
        stats.connectivity_errors = 1;
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(stats.failed_polls(), 1);
    }
}
