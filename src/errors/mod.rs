//! Centralized error handling for the channel catalog
//!
//! Errors are layered the same way the rest of the crate is: network failures
//! from the fetch pipeline are their own type and convert into the top-level
//! [`AppError`] when they abort an import.
//!
//! # Error Categories
//!
//! - **Validation Errors**: unparseable payloads, feeds without a single playable entry
//! - **Network Errors**: every fetch tier exhausted
//! - **Not Found**: unknown source or channel ids
//! - **Configuration Errors**: invalid settings
//!
//! Resolution and liveness checks never surface these to callers; they degrade
//! to a fallback result instead.
//!
//! # Usage
//!
//! ```rust
//! use channel_catalog::errors::{AppError, AppResult};
//!
//! fn example_function(payload: &str) -> AppResult<usize> {
//!     if payload.is_empty() {
//!         return Err(AppError::validation("empty payload"));
//!     }
//!     Ok(payload.len())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for fetch pipeline Results
pub type NetworkResult<T> = Result<T, NetworkError>;
