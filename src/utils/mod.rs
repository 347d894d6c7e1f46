//! Utility modules shared by the parsers, resolver and prober

pub mod attributes;
pub mod http_client;
pub mod url;

// Re-export commonly used types for convenience
pub use http_client::{FetchPipeline, TextFetcher};
pub use url::UrlUtils;
