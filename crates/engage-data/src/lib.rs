//! Data layer for the engagement charts.
//!
//! Responsible for discovering and reading tabular source files, grouping and
//! aggregating their rows, and turning chart descriptions into chart data.

pub mod aggregator;
pub mod analysis;
pub mod reader;

pub use engage_core as core;
