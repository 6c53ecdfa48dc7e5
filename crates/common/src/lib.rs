//! Tillscan Common Utilities
//!
//! Shared infrastructure for all Tillscan crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading and the scanner defaults it carries

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
