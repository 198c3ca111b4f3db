//! Fixed-length sequence packing for causal LM pretraining.
//!
//! Pretraining wants every example to be exactly `context_len` tokens long,
//! while tokenized records come in whatever length the text had. The packer
//! concatenates consecutive records until it has at least `context_len`
//! tokens and cuts a block from the front:
//!
//! ```text
//! records:   [1 2 3] [4 5] [6 7 8 9]        context_len = 4
//! block 0:   [1 2 3 4]   (5 left over)
//! block 1:   [6 7 8 9]   without carry: the 5 is dropped
//!            [5 6 7 8]   with carry:    the 5 starts the next block
//! ```
//!
//! Blocks can be stacked into `[batch_size, context_len]` batches. A
//! partially filled block or batch at end-of-stream is never emitted.
//!
//! # Key Components
//!
//! - [`SequencePacker`]: pulls records from a [`TokenSource`] and cuts blocks
//! - [`Batch`]: a rectangular `ndarray` of stacked blocks
//! - [`PackingStats`]: token accounting (emitted, truncated, discarded)
//! - [`Blocks`] / [`Batches`]: `Iterator` adapters over a packer

use std::iter::FusedIterator;

use grownet_core::{GrownetError, PackedBlock, PackingConfig, Result, TokenId};
use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;

use crate::source::{IterSource, TokenSource};

/// Statistics about a packing run.
///
/// Every token read from the source ends up in exactly one bucket:
/// `tokens_read == tokens_emitted + tokens_truncated + tokens_discarded`
/// plus whatever remainder the packer is still holding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackingStats {
    /// Records pulled from the source.
    pub records: usize,
    /// Tokens pulled from the source.
    pub tokens_read: usize,
    /// Tokens handed to the caller inside blocks or batches.
    pub tokens_emitted: usize,
    /// Tokens past `context_len` dropped at a block boundary.
    pub tokens_truncated: usize,
    /// Tokens thrown away at end-of-stream (partial block or partial batch).
    pub tokens_discarded: usize,
    /// Blocks handed to the caller, including those inside batches.
    pub blocks: usize,
    /// Batches handed to the caller.
    pub batches: usize,
}

impl PackingStats {
    /// Fraction of the tokens read that reached the caller.
    pub fn utilization(&self) -> f64 {
        if self.tokens_read == 0 {
            0.0
        } else {
            self.tokens_emitted as f64 / self.tokens_read as f64
        }
    }

    /// Pretty print stats.
    pub fn summary(&self) -> String {
        format!(
            "Packing: {} records ({} tokens) → {} blocks in {} batches, {:.1}% utilization, {} truncated, {} discarded",
            self.records,
            self.tokens_read,
            self.blocks,
            self.batches,
            self.utilization() * 100.0,
            self.tokens_truncated,
            self.tokens_discarded
        )
    }
}

/// A `[batch_size, context_len]` stack of packed blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    input_ids: Array2<TokenId>,
}

impl Batch {
    /// Stack blocks into a batch. Every block must be `context_len` long.
    pub fn from_blocks(blocks: Vec<PackedBlock>, context_len: usize) -> Result<Self> {
        if let Some(block) = blocks.iter().find(|b| b.len() != context_len) {
            return Err(GrownetError::ShapeMismatch {
                expected: vec![context_len],
                actual: vec![block.len()],
            });
        }

        let rows = blocks.len();
        let flat = blocks.concat();

        let input_ids = Array2::from_shape_vec((rows, context_len), flat).map_err(|e| {
            GrownetError::InvalidArgument(format!("Failed to stack blocks: {}", e))
        })?;
        Ok(Self { input_ids })
    }

    /// Number of rows.
    pub fn batch_size(&self) -> usize {
        self.input_ids.len_of(Axis(0))
    }

    /// Tokens per row.
    pub fn context_len(&self) -> usize {
        self.input_ids.len_of(Axis(1))
    }

    /// Shape as `[batch_size, context_len]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.batch_size(), self.context_len()]
    }

    /// The token array.
    pub fn input_ids(&self) -> &Array2<TokenId> {
        &self.input_ids
    }

    /// One row of the batch.
    ///
    /// # Panics
    /// Panics if `index >= batch_size`.
    pub fn row(&self, index: usize) -> ArrayView1<'_, TokenId> {
        self.input_ids.row(index)
    }

    /// Labels for causal LM loss.
    ///
    /// Packed blocks contain no padding, so the labels are the input ids
    /// themselves; the model shifts them by one position when computing loss.
    pub fn labels(&self) -> Array2<i64> {
        self.input_ids.mapv(i64::from)
    }

    /// Take the token array.
    pub fn into_array(self) -> Array2<TokenId> {
        self.input_ids
    }
}

/// Packs a stream of token records into fixed-length blocks and batches.
///
/// The packer is a one-shot pull iterator: once its source reports
/// exhaustion (or fails) it is spent, and every later call returns
/// `Ok(None)` without touching the source again.
#[derive(Debug)]
pub struct SequencePacker<S> {
    source: S,
    context_len: usize,
    batch_size: Option<usize>,
    carry_remainder: bool,
    remainder: Vec<TokenId>,
    spent: bool,
    stats: PackingStats,
}

impl<S: TokenSource> SequencePacker<S> {
    /// Create a packer over `source`.
    ///
    /// Fails with [`GrownetError::Config`] when `context_len` or
    /// `batch_size` is zero.
    pub fn new(source: S, config: &PackingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            context_len: config.context_len,
            batch_size: config.batch_size,
            carry_remainder: config.carry_remainder,
            remainder: Vec::new(),
            spent: false,
            stats: PackingStats::default(),
        })
    }

    /// Tokens per block.
    pub fn context_len(&self) -> usize {
        self.context_len
    }

    /// Blocks per batch, if batching is configured.
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Whether the source has been exhausted.
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Tokens held over for the next block (always 0 without carry).
    pub fn pending_tokens(&self) -> usize {
        self.remainder.len()
    }

    /// Statistics so far.
    pub fn stats(&self) -> &PackingStats {
        &self.stats
    }

    /// Give back the underlying source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Cut the next block of exactly `context_len` tokens.
    ///
    /// Returns `Ok(None)` at end-of-stream; the tokens accumulated for the
    /// unfinished block are discarded.
    pub fn next_block(&mut self) -> Result<Option<PackedBlock>> {
        let block = self.fill_block()?;
        if block.is_some() {
            self.stats.blocks += 1;
            self.stats.tokens_emitted += self.context_len;
        }
        Ok(block)
    }

    /// Cut `batch_size` blocks and stack them.
    ///
    /// Returns `Ok(None)` at end-of-stream; blocks already cut for the
    /// unfinished batch are discarded. Fails with [`GrownetError::Config`]
    /// when the packer was built without a batch size.
    pub fn next_batch(&mut self) -> Result<Option<Batch>> {
        let batch_size = self.batch_size.ok_or_else(|| {
            GrownetError::Config("next_batch requires packing.batch_size".into())
        })?;

        let mut blocks = Vec::new();
        while blocks.len() < batch_size {
            let block = match self.fill_block() {
                Ok(block) => block,
                Err(e) => {
                    self.stats.tokens_discarded += blocks.len() * self.context_len;
                    return Err(e);
                }
            };
            match block {
                Some(block) => blocks.push(block),
                None => {
                    if !blocks.is_empty() {
                        tracing::warn!(
                            "Dropping partial batch of {}/{} blocks at end of stream",
                            blocks.len(),
                            batch_size
                        );
                        self.stats.tokens_discarded += blocks.len() * self.context_len;
                    }
                    return Ok(None);
                }
            }
        }

        let batch = Batch::from_blocks(blocks, self.context_len)?;
        self.stats.blocks += batch_size;
        self.stats.batches += 1;
        self.stats.tokens_emitted += batch_size * self.context_len;
        Ok(Some(batch))
    }

    /// Iterate over blocks.
    pub fn blocks(self) -> Blocks<S> {
        Blocks { packer: self }
    }

    /// Iterate over batches.
    ///
    /// Fails up front when the packer has no batch size.
    pub fn batches(self) -> Result<Batches<S>> {
        if self.batch_size.is_none() {
            return Err(GrownetError::Config(
                "batches() requires packing.batch_size".into(),
            ));
        }
        Ok(Batches { packer: self })
    }

    fn fill_block(&mut self) -> Result<Option<PackedBlock>> {
        if self.spent {
            return Ok(None);
        }

        // Grows with the records actually read; context_len may be far
        // larger than the corpus.
        let mut acc = std::mem::take(&mut self.remainder);

        while acc.len() < self.context_len {
            match self.source.next_record() {
                Ok(Some(record)) => {
                    self.stats.records += 1;
                    self.stats.tokens_read += record.len();
                    acc.extend_from_slice(&record);
                }
                Ok(None) => {
                    tracing::debug!(
                        "Token source exhausted after {} records, discarding {} tokens",
                        self.stats.records,
                        acc.len()
                    );
                    self.spent = true;
                    self.stats.tokens_discarded += acc.len();
                    return Ok(None);
                }
                Err(e) => {
                    self.spent = true;
                    self.stats.tokens_discarded += acc.len();
                    return Err(e);
                }
            }
        }

        let excess = acc.split_off(self.context_len);
        if self.carry_remainder {
            self.remainder = excess;
        } else {
            self.stats.tokens_truncated += excess.len();
        }
        Ok(Some(acc))
    }
}

impl<I> SequencePacker<IterSource<I>>
where
    I: Iterator,
    I::Item: Into<Vec<TokenId>>,
{
    /// Create a packer over in-memory records.
    pub fn from_records<T>(records: T, config: &PackingConfig) -> Result<Self>
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self::new(IterSource::new(records), config)
    }
}

/// Iterator over the blocks of a [`SequencePacker`].
#[derive(Debug)]
pub struct Blocks<S> {
    packer: SequencePacker<S>,
}

impl<S: TokenSource> Blocks<S> {
    /// Statistics so far.
    pub fn stats(&self) -> &PackingStats {
        self.packer.stats()
    }

    /// Recover the packer.
    pub fn into_packer(self) -> SequencePacker<S> {
        self.packer
    }
}

impl<S: TokenSource> Iterator for Blocks<S> {
    type Item = Result<PackedBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.packer.next_block().transpose()
    }
}

impl<S: TokenSource> FusedIterator for Blocks<S> {}

/// Iterator over the batches of a [`SequencePacker`].
#[derive(Debug)]
pub struct Batches<S> {
    packer: SequencePacker<S>,
}

impl<S: TokenSource> Batches<S> {
    /// Statistics so far.
    pub fn stats(&self) -> &PackingStats {
        self.packer.stats()
    }

    /// Recover the packer.
    pub fn into_packer(self) -> SequencePacker<S> {
        self.packer
    }
}

impl<S: TokenSource> Iterator for Batches<S> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.packer.next_batch().transpose()
    }
}

impl<S: TokenSource> FusedIterator for Batches<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use grownet_core::TokenRecord;
    use proptest::prelude::*;

    /// Source that counts pulls and fails on demand.
    struct CountingSource {
        records: std::vec::IntoIter<TokenRecord>,
        pulls: usize,
        fail_at: Option<usize>,
    }

    impl CountingSource {
        fn new(records: Vec<TokenRecord>) -> Self {
            Self {
                records: records.into_iter(),
                pulls: 0,
                fail_at: None,
            }
        }
    }

    impl TokenSource for CountingSource {
        fn next_record(&mut self) -> Result<Option<TokenRecord>> {
            self.pulls += 1;
            if self.fail_at == Some(self.pulls) {
                return Err(GrownetError::Dataset("corrupt record".into()));
            }
            Ok(self.records.next())
        }
    }

    fn records() -> Vec<Vec<u32>> {
        vec![vec![1, 2, 3], vec![4, 5], vec![6, 7, 8, 9]]
    }

    fn block_config(context_len: usize) -> PackingConfig {
        PackingConfig::with_context_len(context_len)
    }

    #[test]
    fn test_drops_remainder_by_default() {
        let mut packer = SequencePacker::from_records(records(), &block_config(4)).unwrap();

        assert_eq!(packer.next_block().unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(packer.next_block().unwrap(), Some(vec![6, 7, 8, 9]));
        assert_eq!(packer.next_block().unwrap(), None);

        let stats = packer.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.tokens_read, 9);
        assert_eq!(stats.tokens_emitted, 8);
        assert_eq!(stats.tokens_truncated, 1);
        assert_eq!(stats.tokens_discarded, 0);
        assert_eq!(stats.blocks, 2);
    }

    #[test]
    fn test_carry_remainder_starts_next_block() {
        let config = block_config(4).carry_remainder(true);
        let mut packer = SequencePacker::from_records(records(), &config).unwrap();

        assert_eq!(packer.next_block().unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(packer.pending_tokens(), 1);
        assert_eq!(packer.next_block().unwrap(), Some(vec![5, 6, 7, 8]));
        assert_eq!(packer.pending_tokens(), 1);
        assert_eq!(packer.next_block().unwrap(), None);

        let stats = packer.stats();
        assert_eq!(stats.tokens_truncated, 0);
        assert_eq!(stats.tokens_discarded, 1);
        assert_eq!(packer.pending_tokens(), 0);
    }

    #[test]
    fn test_carry_splits_long_record_across_blocks() {
        let config = block_config(3).carry_remainder(true);
        let mut packer =
            SequencePacker::from_records(vec![(0..10).collect::<Vec<u32>>()], &config).unwrap();

        assert_eq!(packer.next_block().unwrap(), Some(vec![0, 1, 2]));
        assert_eq!(packer.next_block().unwrap(), Some(vec![3, 4, 5]));
        assert_eq!(packer.next_block().unwrap(), Some(vec![6, 7, 8]));
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.stats().records, 1);
        assert_eq!(packer.stats().tokens_discarded, 1);
    }

    #[test]
    fn test_short_stream_signals_end() {
        let mut packer =
            SequencePacker::from_records(vec![vec![1u32, 2], vec![3]], &block_config(4)).unwrap();
        assert_eq!(packer.next_block().unwrap(), None);
        assert!(packer.is_spent());
        assert_eq!(packer.stats().tokens_discarded, 3);
    }

    #[test]
    fn test_huge_context_len_short_stream_ends() {
        let config = block_config(usize::MAX / 2);
        let mut packer = SequencePacker::from_records(vec![vec![1u32, 2, 3]], &config).unwrap();
        assert_eq!(packer.context_len(), usize::MAX / 2);
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.stats().tokens_discarded, 3);
    }

    #[test]
    fn test_huge_batch_size_short_stream_ends() {
        let config = block_config(2).batch_size(usize::MAX / 2);
        let mut packer = SequencePacker::from_records(vec![vec![1u32, 2, 3, 4]], &config).unwrap();
        assert_eq!(packer.batch_size(), Some(usize::MAX / 2));
        assert!(packer.next_batch().unwrap().is_none());
        assert_eq!(packer.stats().tokens_discarded, 2);
        assert_eq!(packer.stats().tokens_truncated, 2);
    }

    #[test]
    fn test_empty_records_are_skipped_over() {
        let input: Vec<Vec<u32>> = vec![vec![], vec![1, 2], vec![], vec![3, 4]];
        let mut packer = SequencePacker::from_records(input, &block_config(4)).unwrap();
        assert_eq!(packer.next_block().unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(packer.stats().records, 4);
    }

    #[test]
    fn test_exact_fit_has_no_truncation() {
        let input: Vec<Vec<u32>> = vec![vec![1, 2], vec![3, 4]];
        let mut packer = SequencePacker::from_records(input, &block_config(2)).unwrap();
        assert_eq!(packer.next_block().unwrap(), Some(vec![1, 2]));
        assert_eq!(packer.next_block().unwrap(), Some(vec![3, 4]));
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.stats().tokens_truncated, 0);
    }

    #[test]
    fn test_rejects_zero_context_len() {
        let result = SequencePacker::from_records(records(), &block_config(0));
        assert!(matches!(result, Err(GrownetError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let result = SequencePacker::from_records(records(), &block_config(4).batch_size(0));
        assert!(matches!(result, Err(GrownetError::Config(_))));
    }

    #[test]
    fn test_next_batch_without_batch_size() {
        let mut packer = SequencePacker::from_records(records(), &block_config(4)).unwrap();
        assert!(matches!(packer.next_batch(), Err(GrownetError::Config(_))));

        let packer = SequencePacker::from_records(records(), &block_config(4)).unwrap();
        assert!(packer.batches().is_err());
    }

    #[test]
    fn test_batch_shape_and_rows() {
        let input: Vec<Vec<u32>> = (0..6).map(|i| vec![i * 10, i * 10 + 1]).collect();
        let config = block_config(2).batch_size(3);
        let mut packer = SequencePacker::from_records(input, &config).unwrap();

        let batch = packer.next_batch().unwrap().unwrap();
        assert_eq!(batch.shape(), [3, 2]);
        assert_eq!(batch.row(0).to_vec(), vec![0, 1]);
        assert_eq!(batch.row(2).to_vec(), vec![20, 21]);
        let flat: Vec<u32> = batch.input_ids().iter().copied().collect();
        assert_eq!(flat, vec![0, 1, 10, 11, 20, 21]);

        let batch = packer.next_batch().unwrap().unwrap();
        assert_eq!(batch.row(0).to_vec(), vec![30, 31]);
        assert!(packer.next_batch().unwrap().is_none());

        assert_eq!(packer.stats().batches, 2);
        assert_eq!(packer.stats().blocks, 6);
    }

    #[test]
    fn test_partial_batch_is_discarded() {
        // Five blocks worth of data, batches of two: the fifth block is cut
        // and then thrown away with its batch.
        let input: Vec<Vec<u32>> = (0..5).map(|i| vec![i; 4]).collect();
        let config = block_config(4).batch_size(2);
        let batches: Vec<Batch> = SequencePacker::from_records(input, &config)
            .unwrap()
            .batches()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].row(1).to_vec(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_partial_batch_stats() {
        let input: Vec<Vec<u32>> = (0..5).map(|i| vec![i; 4]).collect();
        let config = block_config(4).batch_size(2);
        let mut batches = SequencePacker::from_records(input, &config)
            .unwrap()
            .batches()
            .unwrap();
        for batch in batches.by_ref() {
            batch.unwrap();
        }

        let stats = batches.stats();
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.blocks, 4);
        assert_eq!(stats.tokens_emitted, 16);
        assert_eq!(stats.tokens_discarded, 4);
    }

    #[test]
    fn test_labels_match_inputs() {
        let config = block_config(3).batch_size(1);
        let mut packer = SequencePacker::from_records(vec![vec![7u32, 8, 9]], &config).unwrap();
        let batch = packer.next_batch().unwrap().unwrap();
        let labels = batch.labels();
        assert_eq!(labels.shape(), &[1, 3]);
        assert_eq!(labels.row(0).to_vec(), vec![7i64, 8, 9]);
    }

    #[test]
    fn test_spent_packer_never_pulls_again() {
        let mut packer =
            SequencePacker::new(CountingSource::new(vec![vec![1, 2]]), &block_config(4)).unwrap();
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.next_block().unwrap(), None);

        let source = packer.into_source();
        assert_eq!(source.pulls, 2);
    }

    #[test]
    fn test_source_error_propagates_and_spends_packer() {
        let mut source = CountingSource::new(records());
        source.fail_at = Some(2);
        let mut packer = SequencePacker::new(source, &block_config(4)).unwrap();

        let err = packer.next_block().unwrap_err();
        assert!(err.to_string().contains("corrupt record"));
        assert!(packer.is_spent());
        assert_eq!(packer.next_block().unwrap(), None);
        assert_eq!(packer.stats().tokens_discarded, 3);
    }

    #[test]
    fn test_blocks_iterator() {
        let blocks: Vec<PackedBlock> = SequencePacker::from_records(records(), &block_config(2))
            .unwrap()
            .blocks()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocks, vec![vec![1, 2], vec![4, 5], vec![6, 7]]);
    }

    #[test]
    fn test_iterators_hand_back_packer() {
        let mut blocks = SequencePacker::from_records(records(), &block_config(2))
            .unwrap()
            .blocks();
        assert_eq!(blocks.next().unwrap().unwrap(), vec![1, 2]);

        let mut packer = blocks.into_packer();
        assert_eq!(packer.stats().blocks, 1);
        assert_eq!(packer.next_block().unwrap(), Some(vec![4, 5]));

        let mut batches = SequencePacker::from_records(records(), &block_config(2).batch_size(1))
            .unwrap()
            .batches()
            .unwrap();
        assert_eq!(batches.next().unwrap().unwrap().row(0).to_vec(), vec![1, 2]);
        let packer = batches.into_packer();
        assert_eq!(packer.stats().batches, 1);
        assert!(!packer.is_spent());
    }

    #[test]
    fn test_batch_into_array() {
        let batch = Batch::from_blocks(vec![vec![1, 2], vec![3, 4]], 2).unwrap();
        let array = batch.into_array();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 0]], 3);
    }

    #[test]
    fn test_batch_from_blocks_rejects_ragged() {
        let result = Batch::from_blocks(vec![vec![1, 2], vec![3]], 2);
        assert!(matches!(result, Err(GrownetError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_stats_summary() {
        let mut packer = SequencePacker::from_records(records(), &block_config(4)).unwrap();
        while packer.next_block().unwrap().is_some() {}
        let summary = packer.stats().summary();
        assert!(summary.contains("3 records"), "{}", summary);
        assert!(summary.contains("2 blocks"), "{}", summary);
        assert!((packer.stats().utilization() - 8.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_empty() {
        assert_eq!(PackingStats::default().utilization(), 0.0);
    }

    fn arb_records() -> impl Strategy<Value = Vec<Vec<u32>>> {
        prop::collection::vec(prop::collection::vec(0u32..50_000, 0..12), 0..40)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_first_block_is_prefix_of_concatenation(
            input in arb_records(),
            context_len in 1usize..16,
        ) {
            let flat: Vec<u32> = input.iter().flatten().copied().collect();
            let mut packer = SequencePacker::from_records(input, &block_config(context_len)).unwrap();
            let block = packer.next_block().unwrap();

            if flat.len() >= context_len {
                let block = block.unwrap();
                prop_assert_eq!(block.len(), context_len);
                prop_assert_eq!(&block[..], &flat[..context_len]);
            } else {
                prop_assert!(block.is_none());
            }
        }

        #[test]
        fn prop_every_block_has_context_len(
            input in arb_records(),
            context_len in 1usize..16,
            carry in any::<bool>(),
        ) {
            let config = block_config(context_len).carry_remainder(carry);
            let packer = SequencePacker::from_records(input, &config).unwrap();
            for block in packer.blocks() {
                prop_assert_eq!(block.unwrap().len(), context_len);
            }
        }

        #[test]
        fn prop_carry_emits_concatenation_in_order(
            input in arb_records(),
            context_len in 1usize..16,
        ) {
            let flat: Vec<u32> = input.iter().flatten().copied().collect();
            let config = block_config(context_len).carry_remainder(true);
            let emitted: Vec<u32> = SequencePacker::from_records(input, &config)
                .unwrap()
                .blocks()
                .flat_map(|b| b.unwrap())
                .collect();

            let whole = flat.len() / context_len * context_len;
            prop_assert_eq!(&emitted[..], &flat[..whole]);
        }

        #[test]
        fn prop_batches_are_rectangular(
            input in arb_records(),
            context_len in 1usize..8,
            batch_size in 1usize..5,
            carry in any::<bool>(),
        ) {
            let config = block_config(context_len).batch_size(batch_size).carry_remainder(carry);
            let batches = SequencePacker::from_records(input, &config).unwrap().batches().unwrap();
            for batch in batches {
                prop_assert_eq!(batch.unwrap().shape(), [batch_size, context_len]);
            }
        }

        #[test]
        fn prop_tokens_are_accounted_for(
            input in arb_records(),
            context_len in 1usize..8,
            batch_size in 1usize..5,
            carry in any::<bool>(),
        ) {
            let config = block_config(context_len).batch_size(batch_size).carry_remainder(carry);
            let mut packer = SequencePacker::from_records(input, &config).unwrap();
            while packer.next_batch().unwrap().is_some() {}

            let stats = packer.stats();
            prop_assert_eq!(
                stats.tokens_read,
                stats.tokens_emitted + stats.tokens_truncated + stats.tokens_discarded + packer.pending_tokens()
            );
            prop_assert_eq!(stats.blocks, stats.batches * batch_size);
        }
    }
}
