//! Configuration types for grownet.

use crate::{GrownetError, Result, TextFormat, TokenId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sequence packing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingConfig {
    /// Number of tokens in every packed block.
    #[serde(default = "default_context_len")]
    pub context_len: usize,

    /// Blocks per batch. `None` packs single blocks only.
    #[serde(default = "default_batch_size")]
    pub batch_size: Option<usize>,

    /// Keep the tokens accumulated past `context_len` for the next block
    /// instead of dropping them.
    #[serde(default)]
    pub carry_remainder: bool,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            context_len: default_context_len(),
            batch_size: default_batch_size(),
            carry_remainder: false,
        }
    }
}

impl PackingConfig {
    /// Create a block-only config with the given context length.
    pub fn with_context_len(context_len: usize) -> Self {
        Self {
            context_len,
            batch_size: None,
            carry_remainder: false,
        }
    }

    /// Stack blocks into batches of `batch_size` rows.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set whether the remainder past `context_len` is carried forward.
    pub fn carry_remainder(mut self, carry: bool) -> Self {
        self.carry_remainder = carry;
        self
    }

    /// Check the sizes are usable.
    pub fn validate(&self) -> Result<()> {
        if self.context_len == 0 {
            return Err(GrownetError::Config(
                "context_len must be greater than zero".into(),
            ));
        }
        if self.batch_size == Some(0) {
            return Err(GrownetError::Config(
                "batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Raw text corpus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the corpus file.
    #[serde(default)]
    pub path: PathBuf,

    /// Corpus layout.
    #[serde(default)]
    pub format: TextFormat,

    /// JSONL field containing the record text.
    #[serde(default = "default_text_column")]
    pub text_column: String,

    /// Stop after this many records (None for all).
    #[serde(default)]
    pub max_records: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            format: TextFormat::default(),
            text_column: default_text_column(),
            max_records: None,
        }
    }
}

/// Tokenizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// HuggingFace `tokenizer.json`. Falls back to byte-level encoding when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Let the tokenizer add its special tokens (BOS/EOS) to every record.
    #[serde(default = "default_true")]
    pub add_special_tokens: bool,

    /// Id appended after every record by the byte-level encoder.
    #[serde(default)]
    pub eos_token_id: Option<TokenId>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            path: None,
            add_special_tokens: true,
            eos_token_id: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Packed token file (little-endian u32, row-major).
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Where to write packing statistics as JSON.
    #[serde(default)]
    pub stats_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            stats_path: None,
        }
    }
}

/// Everything one packing run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Corpus configuration.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Tokenizer configuration.
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Packing configuration.
    #[serde(default)]
    pub packing: PackingConfig,

    /// Output configuration.
    #[serde(default)]
    pub output: OutputConfig,

    /// Log progress every N batches.
    #[serde(default = "default_log_every")]
    pub log_every: usize,

    /// Stop after this many batches, or blocks when unbatched (None for the whole corpus).
    #[serde(default)]
    pub max_batches: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            tokenizer: TokenizerConfig::default(),
            packing: PackingConfig::default(),
            output: OutputConfig::default(),
            log_every: default_log_every(),
            max_batches: None,
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GrownetError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config {}: {}", path.as_ref().display(), e),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a run configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.packing.validate()?;
        if self.dataset.path.as_os_str().is_empty() {
            return Err(GrownetError::Config("dataset.path is required".into()));
        }
        if self.dataset.text_column.is_empty() {
            return Err(GrownetError::Config(
                "dataset.text_column must not be empty".into(),
            ));
        }
        if self.log_every == 0 {
            return Err(GrownetError::Config(
                "log_every must be greater than zero".into(),
            ));
        }
        if self.max_batches == Some(0) {
            return Err(GrownetError::Config(
                "max_batches must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_context_len() -> usize {
    1024
}
fn default_batch_size() -> Option<usize> {
    Some(16)
}
fn default_true() -> bool {
    true
}
fn default_text_column() -> String {
    "text".into()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("./packed.bin")
}
fn default_log_every() -> usize {
    100
}
