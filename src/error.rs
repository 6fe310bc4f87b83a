//! Error handling for pvtrend
//!
//! This module defines the crate error type and a Result alias. Very little
//! in the plot core is fallible: configuration values are clamped, bad
//! samples are stored and filtered later, and severity codes degrade to
//! `Unknown`. Errors come from rendering-surface calls, config file IO and
//! the background worker.

use thiserror::Error;

/// Main error type for pvtrend operations
#[derive(Error, Debug)]
pub enum PlotError {
    /// The rendering surface rejected a data update
    #[error("Render error: {0}")]
    Render(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// The background frame worker failed or disconnected
    #[error("Worker error: {0}")]
    Worker(String),

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
        source: Box<PlotError>,
    },
}

impl PlotError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PlotError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PlotError {
    fn from(err: serde_json::Error) -> Self {
        PlotError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PlotError {
    fn from(err: toml::de::Error) -> Self {
        PlotError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for PlotError {
    fn from(err: toml::ser::Error) -> Self {
        PlotError::Serialization(err.to_string())
    }
}

/// Result type alias for pvtrend operations
pub type Result<T> = std::result::Result<T, PlotError>;

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
