//! Packed token files.
//!
//! The file format is concatenated little-endian u32 token ids, row-major,
//! `context_len` ids per block. No header; the reader must know the context
//! length.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use grownet_core::{GrownetError, Result, TokenId};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::packing::Batch;

/// Writes packed blocks to a token file.
pub struct BlockWriter<W: Write> {
    writer: W,
    blocks_written: usize,
}

impl BlockWriter<BufWriter<File>> {
    /// Create (or truncate) a token file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref()).map_err(|e| {
            GrownetError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create {}: {}", path.as_ref().display(), e),
            ))
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> BlockWriter<W> {
    /// Write blocks to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            blocks_written: 0,
        }
    }

    /// Append one block.
    pub fn write_block(&mut self, block: &[TokenId]) -> Result<()> {
        for &id in block {
            self.writer.write_u32::<LittleEndian>(id)?;
        }
        self.blocks_written += 1;
        Ok(())
    }

    /// Append every row of a batch.
    pub fn write_batch(&mut self, batch: &Batch) -> Result<()> {
        for &id in batch.input_ids().iter() {
            self.writer.write_u32::<LittleEndian>(id)?;
        }
        self.blocks_written += batch.batch_size();
        Ok(())
    }

    /// Blocks written so far.
    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Read a token file back as `[num_blocks, context_len]`.
pub fn read_blocks<P: AsRef<Path>>(path: P, context_len: usize) -> Result<Array2<TokenId>> {
    let file = File::open(path.as_ref()).map_err(|e| {
        GrownetError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.as_ref().display(), e),
        ))
    })?;
    read_blocks_from(file, context_len)
}

/// Read `[num_blocks, context_len]` token ids from any reader.
pub fn read_blocks_from<R: Read>(mut reader: R, context_len: usize) -> Result<Array2<TokenId>> {
    if context_len == 0 {
        return Err(GrownetError::InvalidArgument(
            "context_len must be greater than zero".into(),
        ));
    }

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let block_bytes = context_len
        .checked_mul(std::mem::size_of::<TokenId>())
        .ok_or_else(|| {
            GrownetError::InvalidArgument(format!("context_len {} is too large", context_len))
        })?;
    if bytes.len() % block_bytes != 0 {
        return Err(GrownetError::ShapeMismatch {
            expected: vec![bytes.len() / block_bytes + 1, context_len],
            actual: vec![bytes.len() / std::mem::size_of::<TokenId>()],
        });
    }

    let num_blocks = bytes.len() / block_bytes;
    let mut ids = vec![0; num_blocks * context_len];
    bytes.as_slice().read_u32_into::<LittleEndian>(&mut ids)?;

    Array2::from_shape_vec((num_blocks, context_len), ids)
        .map_err(|e| GrownetError::InvalidArgument(format!("Failed to shape blocks: {}", e)))
}
