//! Core types and configuration for grownet sequence packing.
//!
//! This crate provides the foundational pieces shared by the data pipeline
//! and the command line tool:
//!
//! - Error handling infrastructure
//! - Configuration types for packing, corpus reading, tokenization and output
//! - Common type definitions (token ids, corpus formats)

#![warn(missing_docs)]

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{GrownetError, Result};
    pub use crate::types::*;
}
