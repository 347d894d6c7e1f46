//! Catalog-level services built on the parsers, matcher and generator

pub mod catalog;

pub use catalog::{CatalogService, ImportSummary};
