//! Playlist output for downstream players

pub mod generator;

pub use generator::generate_m3u;
