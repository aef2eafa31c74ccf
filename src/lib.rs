//! RecBlend library crate
//!
//! Re-exports core modules for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod recommendation;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use recommendation::*;
