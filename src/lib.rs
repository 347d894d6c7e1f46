pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod proxy;
pub mod services;
pub mod sources;
pub mod streaming;
pub mod utils;
