//! Shared types for the engagement chart tools: the in-memory table model,
//! chart descriptions, settings and the error taxonomy.

pub mod chart;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{EngageError, Result};
