//! Test data builders for creating test objects

use climavis_rs::backend::FetchError;
use climavis_rs::history::{HistoryBuffer, SharedHistory};
use climavis_rs::SensorSample;

/// Builder for creating test samples
pub struct SampleBuilder {
    sample: SensorSample,
}

impl SampleBuilder {
    pub fn new() -> Self {
        Self {
            sample: SensorSample::new(24.5, 55.0, 1013.25, 42, false),
        }
    }

    pub fn temperature(mut self, value: f64) -> Self {
        self.sample.temperature = value;
        self
    }

    pub fn humidity(mut self, value: f64) -> Self {
        self.sample.humidity = value;
        self
    }

    pub fn pressure(mut self, value: f64) -> Self {
        self.sample.pressure = value;
        self
    }

    pub fn air_quality(mut self, value: i64) -> Self {
        self.sample.air_quality_index = value;
        self
    }

    pub fn raining(mut self) -> Self {
        self.sample.rain_detected = true;
        self
    }

    pub fn build(self) -> SensorSample {
        self.sample
    }
}

impl Default for SampleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Empty shared history with the default capacities
pub fn shared_history() -> SharedHistory {
    HistoryBuffer::default().into_shared()
}

/// Error that does not advance the address cascade
pub fn payload_error() -> FetchError {
    FetchError::MissingField("temperature")
}

/// Error that advances the address cascade
pub fn connectivity_error() -> FetchError {
    FetchError::Timeout
}
