//! One packing run: corpus in, packed token file out.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use grownet_core::{GrownetError, Result, RunConfig};
use grownet_data::{
    load_encoder, open_corpus, BlockWriter, PackingStats, SequencePacker, TextEncoder,
    TextRecordReader, TokenizedSource,
};
use indicatif::ProgressBar;
use serde::Serialize;

type CorpusSource = TokenizedSource<TextRecordReader<BufReader<File>>, Box<dyn TextEncoder>>;

/// What a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Packer statistics.
    pub stats: PackingStats,
    /// Blocks written to the output file.
    pub blocks_written: usize,
    /// Tokens per block.
    pub context_len: usize,
    /// Blocks per batch, if batching.
    pub batch_size: Option<usize>,
    /// Output file.
    pub output: PathBuf,
    /// Wall clock seconds.
    pub elapsed_secs: f64,
}

/// State owned by a single packing run.
///
/// Created from a validated [`RunConfig`]; dropping it closes the corpus.
pub struct PackingRun {
    config: RunConfig,
    packer: SequencePacker<CorpusSource>,
}

impl PackingRun {
    /// Validate the configuration, open the corpus and load the tokenizer.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;

        let encoder = load_encoder(&config.tokenizer)?;
        let records = open_corpus(&config.dataset)?;
        let packer = SequencePacker::new(TokenizedSource::new(records, encoder), &config.packing)?;

        Ok(Self { config, packer })
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Pack the corpus into `writer` and report.
    ///
    /// With a batch size, whole batches are written; otherwise single blocks.
    /// `max_batches` caps whichever unit is being written.
    pub fn run<W: Write>(
        mut self,
        mut writer: BlockWriter<W>,
        progress: Option<&ProgressBar>,
    ) -> Result<(RunSummary, W)> {
        let start = Instant::now();
        let limit = self.config.max_batches.unwrap_or(usize::MAX);
        let log_every = self.config.log_every;
        let mut written = 0usize;

        tracing::info!(
            "Packing with context_len={}, batch_size={:?}, carry_remainder={}",
            self.config.packing.context_len,
            self.config.packing.batch_size,
            self.config.packing.carry_remainder
        );

        while written < limit {
            let produced = match self.config.packing.batch_size {
                Some(_) => match self.packer.next_batch()? {
                    Some(batch) => {
                        writer.write_batch(&batch)?;
                        true
                    }
                    None => false,
                },
                None => match self.packer.next_block()? {
                    Some(block) => {
                        writer.write_block(&block)?;
                        true
                    }
                    None => false,
                },
            };
            if !produced {
                break;
            }

            written += 1;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            if written % log_every == 0 {
                let stats = self.packer.stats();
                tracing::info!(
                    "{} written | {} records read | {:.1}% utilization",
                    written,
                    stats.records,
                    stats.utilization() * 100.0
                );
            }
        }

        if written == limit {
            tracing::info!("Reached max_batches={}, stopping", limit);
        }

        let blocks_written = writer.blocks_written();
        let inner = writer.finish()?;
        let stats = self.packer.stats().clone();
        tracing::info!("{}", stats.summary());

        let summary = RunSummary {
            stats,
            blocks_written,
            context_len: self.config.packing.context_len,
            batch_size: self.config.packing.batch_size,
            output: self.config.output.path.clone(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        Ok((summary, inner))
    }
}

/// Write a run summary as pretty JSON.
pub fn write_summary(summary: &RunSummary, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|e| {
        GrownetError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write stats to {}: {}", path.display(), e),
        ))
    })
}
