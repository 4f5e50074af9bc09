//! Terminal rendering for engagement charts.
//!
//! Provides themes, share bars, the chart views drawn with [`ratatui`] and
//! the printer that writes them to the terminal or to text files.

pub mod chart_view;
pub mod components;
pub mod output;
pub mod text;
pub mod themes;

pub use engage_core as core;
