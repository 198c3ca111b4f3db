//! Tokenizer integration.

use grownet_core::{GrownetError, Result, TokenId, TokenizerConfig};
use std::path::Path;

/// Turns one text record into token ids.
pub trait TextEncoder {
    /// Encode a record.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Number of distinct ids this encoder can produce.
    fn vocab_size(&self) -> usize;
}

impl<E: TextEncoder + ?Sized> TextEncoder for &E {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        (**self).encode(text)
    }

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }
}

impl<E: TextEncoder + ?Sized> TextEncoder for Box<E> {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        (**self).encode(text)
    }

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }
}

/// Wrapper around the tokenizers library.
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
    add_special_tokens: bool,
}

impl Tokenizer {
    /// Load a tokenizer from a local `tokenizer.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path.as_ref()).map_err(|e| {
            GrownetError::Tokenizer(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self {
            inner,
            add_special_tokens: true,
        })
    }

    /// Load a tokenizer from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| GrownetError::Tokenizer(e.to_string()))?;
        Ok(Self {
            inner,
            add_special_tokens: true,
        })
    }

    /// Choose whether [`TextEncoder::encode`] adds special tokens.
    pub fn with_special_tokens(mut self, add: bool) -> Self {
        self.add_special_tokens = add;
        self
    }

    /// Encode text to token IDs.
    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| GrownetError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Encode text with special tokens.
    pub fn encode_with_special_tokens(&self, text: &str) -> Result<Vec<TokenId>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| GrownetError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token IDs to text.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| GrownetError::Tokenizer(e.to_string()))
    }

    /// Get vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Get EOS token ID if available.
    pub fn eos_token_id(&self) -> Option<TokenId> {
        self.inner
            .token_to_id("</s>")
            .or_else(|| self.inner.token_to_id("<|endoftext|>"))
            .or_else(|| self.inner.token_to_id("<|end_of_text|>"))
            .or_else(|| self.inner.token_to_id("<eos>"))
    }
}

impl TextEncoder for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        if self.add_special_tokens {
            self.encode_with_special_tokens(text)
        } else {
            Tokenizer::encode(self, text)
        }
    }

    fn vocab_size(&self) -> usize {
        Tokenizer::vocab_size(self)
    }
}

/// Byte-level fallback: every UTF-8 byte is its own id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteEncoder {
    eos_token_id: Option<TokenId>,
}

impl ByteEncoder {
    /// Create an encoder that appends `eos_token_id` after every record.
    pub fn new(eos_token_id: Option<TokenId>) -> Self {
        Self { eos_token_id }
    }
}

impl TextEncoder for ByteEncoder {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut ids: Vec<TokenId> = text.bytes().map(TokenId::from).collect();
        if let Some(eos) = self.eos_token_id {
            ids.push(eos);
        }
        Ok(ids)
    }

    fn vocab_size(&self) -> usize {
        match self.eos_token_id {
            Some(eos) => (eos as usize + 1).max(256),
            None => 256,
        }
    }
}

/// Build the encoder a run configuration asks for.
pub fn load_encoder(config: &TokenizerConfig) -> Result<Box<dyn TextEncoder>> {
    match &config.path {
        Some(path) => {
            let tokenizer = Tokenizer::from_file(path)?.with_special_tokens(config.add_special_tokens);
            tracing::info!(
                "Loaded tokenizer from {} (vocab size {})",
                path.display(),
                tokenizer.vocab_size()
            );
            Ok(Box::new(tokenizer))
        }
        None => {
            tracing::info!("No tokenizer configured, using byte-level encoding");
            Ok(Box::new(ByteEncoder::new(config.eos_token_id)))
        }
    }
}
