//! Token stream handling for grownet.
//!
//! This crate provides:
//! - Lazy corpus reading (JSONL with a text column, or plain text)
//! - Tokenizer integration with a byte-level fallback
//! - Fixed-length sequence packing into blocks and batches
//! - Packed token file writing and reading

#![warn(missing_docs)]

pub mod dataset;
pub mod io;
pub mod packing;
pub mod source;
pub mod tokenizer;

pub use dataset::*;
pub use io::*;
pub use packing::*;
pub use source::*;
pub use tokenizer::*;
