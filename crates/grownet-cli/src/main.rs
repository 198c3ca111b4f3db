//! grownet CLI - fixed-length sequence packing for LM pretraining.

mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use grownet_core::{RunConfig, TextFormat};
use grownet_data::{read_blocks, BlockWriter, Tokenizer};
use indicatif::{ProgressBar, ProgressStyle};

use crate::run::{write_summary, PackingRun};

#[derive(Parser)]
#[command(name = "grownet")]
#[command(author, version, about = "Pack tokenized corpora into fixed-length training blocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a corpus and pack it into fixed-length blocks
    Pack(PackArgs),

    /// Show the contents of a packed token file
    Inspect {
        /// Packed token file
        file: PathBuf,

        /// Tokens per block the file was written with
        #[arg(long)]
        context_len: usize,

        /// Number of blocks to print
        #[arg(long, default_value = "4")]
        show: usize,

        /// Tokenizer used to decode the printed blocks
        #[arg(long)]
        tokenizer: Option<PathBuf>,
    },

    /// Write the default run configuration as YAML
    InitConfig {
        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Path to run configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus path (JSONL or plain text)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Corpus format
    #[arg(long, value_parser = parse_format)]
    format: Option<TextFormat>,

    /// JSONL field holding the record text
    #[arg(long)]
    text_column: Option<String>,

    /// HuggingFace tokenizer.json (byte-level encoding when omitted)
    #[arg(short, long)]
    tokenizer: Option<PathBuf>,

    /// Tokens per packed block
    #[arg(long)]
    context_len: Option<usize>,

    /// Blocks per batch
    #[arg(long, conflicts_with = "no_batch")]
    batch_size: Option<usize>,

    /// Write single blocks instead of batches
    #[arg(long)]
    no_batch: bool,

    /// Carry tokens past the context length into the next block
    #[arg(long, conflicts_with = "no_carry_remainder")]
    carry_remainder: bool,

    /// Drop tokens past the context length (overrides the config file)
    #[arg(long)]
    no_carry_remainder: bool,

    /// Output token file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write packing statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Stop after this many corpus records
    #[arg(long)]
    max_records: Option<usize>,

    /// Stop after this many batches (blocks with --no-batch)
    #[arg(long)]
    max_batches: Option<usize>,

    /// Log progress every N batches
    #[arg(long)]
    log_every: Option<usize>,
}

fn parse_format(s: &str) -> Result<TextFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "jsonl" | "json" => Ok(TextFormat::Jsonl),
        "text" | "txt" | "plain_text" => Ok(TextFormat::PlainText),
        "auto" => Ok(TextFormat::Auto),
        other => Err(format!("unknown format '{}' (expected jsonl, text or auto)", other)),
    }
}

/// Load the config file (if any) and apply CLI overrides on top.
fn build_run_config(args: &PackArgs) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(ref dataset) = args.dataset {
        config.dataset.path = dataset.clone();
    }
    if let Some(format) = args.format {
        config.dataset.format = format;
    }
    if let Some(ref column) = args.text_column {
        config.dataset.text_column = column.clone();
    }
    if args.max_records.is_some() {
        config.dataset.max_records = args.max_records;
    }
    if let Some(ref tokenizer) = args.tokenizer {
        config.tokenizer.path = Some(tokenizer.clone());
    }
    if let Some(context_len) = args.context_len {
        config.packing.context_len = context_len;
    }
    if args.no_batch {
        config.packing.batch_size = None;
    } else if args.batch_size.is_some() {
        config.packing.batch_size = args.batch_size;
    }
    if args.carry_remainder {
        config.packing.carry_remainder = true;
    } else if args.no_carry_remainder {
        config.packing.carry_remainder = false;
    }
    if let Some(ref output) = args.output {
        config.output.path = output.clone();
    }
    if let Some(ref stats) = args.stats {
        config.output.stats_path = Some(stats.clone());
    }
    if args.max_batches.is_some() {
        config.max_batches = args.max_batches;
    }
    if let Some(log_every) = args.log_every {
        config.log_every = log_every;
    }

    Ok(config)
}

fn run_pack(args: PackArgs) -> anyhow::Result<()> {
    let packing_run = PackingRun::new(build_run_config(&args)?)?;
    let output = packing_run.config().output.path.clone();
    let stats_path = packing_run.config().output.stats_path.clone();
    let writer = BlockWriter::create(&output)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} written ({per_sec})")
            .context("invalid progress template")?,
    );

    let (summary, _) = packing_run.run(writer, Some(&progress))?;
    progress.finish_and_clear();

    tracing::info!(
        "Wrote {} blocks of {} tokens to {} in {:.2}s",
        summary.blocks_written,
        summary.context_len,
        output.display(),
        summary.elapsed_secs
    );

    if let Some(path) = stats_path {
        write_summary(&summary, &path)?;
        tracing::info!("Saved packing stats to {}", path.display());
    }

    Ok(())
}

fn run_inspect(
    file: PathBuf,
    context_len: usize,
    show: usize,
    tokenizer: Option<PathBuf>,
) -> anyhow::Result<()> {
    let blocks = read_blocks(&file, context_len)
        .with_context(|| format!("reading {}", file.display()))?;
    let tokenizer = tokenizer.map(Tokenizer::from_file).transpose()?;

    println!(
        "{}: {} blocks x {} tokens",
        file.display(),
        blocks.nrows(),
        blocks.ncols()
    );

    for (i, row) in blocks.outer_iter().take(show).enumerate() {
        let ids = row.to_vec();
        match &tokenizer {
            Some(tok) => println!("[{}] {:?}", i, tok.decode(&ids)?),
            None => println!("[{}] {:?}", i, ids),
        }
    }

    Ok(())
}

fn run_init_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let yaml = RunConfig::default().to_yaml()?;
    match output {
        Some(path) => {
            std::fs::write(&path, yaml)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote default config to {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack(args) => run_pack(args),
        Commands::Inspect {
            file,
            context_len,
            show,
            tokenizer,
        } => run_inspect(file, context_len, show, tokenizer),
        Commands::InitConfig { output } => run_init_config(output),
    }
}
