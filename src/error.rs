//! Error handling for the ClimaVis-RS application
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application. Failures of a single station poll have their
//! own type, [`crate::backend::device::FetchError`], because they never
//! propagate out of the polling loop.

use thiserror::Error;

/// Main error type for ClimaVis-RS operations
#[derive(Error, Debug)]
pub enum ClimaVisError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors building or using the HTTP client
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Errors related to network service discovery
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Errors from the spreadsheet writer
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ClimaVisError>,
    },
}

impl ClimaVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ClimaVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for ClimaVisError {
    fn from(err: reqwest::Error) -> Self {
        ClimaVisError::Http(err.to_string())
    }
}

impl From<mdns_sd::Error> for ClimaVisError {
    fn from(err: mdns_sd::Error) -> Self {
        ClimaVisError::Discovery(err.to_string())
    }
}

/// Result type alias for ClimaVis-RS operations
pub type Result<T> = std::result::Result<T, ClimaVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ClimaVisError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ClimaVisError::from(e).with_context(f()))
    }
}
