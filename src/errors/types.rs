//! Error type definitions for the channel catalog
//!
//! This module defines the error types used throughout the crate. The
//! hierarchy is intentionally shallow: import paths return [`AppError`], the
//! fetch pipeline returns [`NetworkError`].

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Payload could not be parsed, or yielded nothing usable
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// All network tiers failed
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Failures of a single fetch attempt, and of the pipeline as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Request did not finish within its hard timeout
    #[error("Request timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Upstream answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Http { url: String, status: u16 },

    /// Connection, TLS or protocol failure
    #[error("Transport error: {url} - {message}")]
    Transport { url: String, message: String },

    /// Body could not be read or decoded
    #[error("Failed to read response body: {url} - {message}")]
    Body { url: String, message: String },

    /// Direct fetch and every relay failed
    #[error("All {attempts} fetch attempts failed for {url}: {last_error}")]
    Exhausted {
        url: String,
        attempts: usize,
        last_error: Box<NetworkError>,
    },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl NetworkError {
    /// Whether this failure was caused by the hard timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Exhausted { last_error, .. } => last_error.is_timeout(),
            _ => false,
        }
    }
}
