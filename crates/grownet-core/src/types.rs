//! Common type definitions.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Integer token identifier produced by a tokenizer.
pub type TokenId = u32;

/// One tokenized text unit.
pub type TokenRecord = Vec<TokenId>;

/// Exactly `context_len` token ids cut from the record stream.
pub type PackedBlock = Vec<TokenId>;

/// On-disk layout of a raw text corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// One JSON object per line; the text lives under a named column.
    Jsonl,
    /// One record per line.
    PlainText,
    /// Pick from the file extension.
    #[default]
    Auto,
}

impl TextFormat {
    /// Resolve `Auto` using the extension of `path`.
    ///
    /// `.jsonl` and `.json` map to [`TextFormat::Jsonl`], anything else to
    /// [`TextFormat::PlainText`]. Explicit formats are returned unchanged.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("json") => {
                    Self::Jsonl
                }
                _ => Self::PlainText,
            },
            other => other,
        }
    }
}
