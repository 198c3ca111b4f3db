//! Lazy corpus reading.
//!
//! Records are read one line at a time so a corpus never has to fit in
//! memory. Blank lines are skipped in both formats.

use grownet_core::{DatasetConfig, GrownetError, Result, TextFormat, TokenRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::source::TokenSource;
use crate::tokenizer::TextEncoder;

/// Iterator over the text records of a corpus.
pub struct TextRecordReader<R> {
    lines: std::io::Lines<R>,
    format: TextFormat,
    text_column: String,
    max_records: Option<usize>,
    line_num: usize,
    emitted: usize,
}

impl<R: BufRead> TextRecordReader<R> {
    /// Read records from `reader`.
    ///
    /// `format` must be resolved; [`TextFormat::Auto`] is treated as plain text.
    pub fn new(reader: R, format: TextFormat, text_column: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            format,
            text_column: text_column.into(),
            max_records: None,
            line_num: 0,
            emitted: 0,
        }
    }

    /// Stop after `max_records` records.
    pub fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }

    /// Records produced so far.
    pub fn records_read(&self) -> usize {
        self.emitted
    }

    fn parse_line(&self, line: String) -> Result<String> {
        match self.format {
            TextFormat::Jsonl => {
                let value: serde_json::Value = serde_json::from_str(&line).map_err(|e| {
                    GrownetError::Dataset(format!("Invalid JSON on line {}: {}", self.line_num, e))
                })?;
                match value.get(self.text_column.as_str()) {
                    Some(serde_json::Value::String(text)) => Ok(text.clone()),
                    Some(_) => Err(GrownetError::Dataset(format!(
                        "Column '{}' on line {} is not a string",
                        self.text_column, self.line_num
                    ))),
                    None => Err(GrownetError::Dataset(format!(
                        "Column '{}' not found on line {}",
                        self.text_column, self.line_num
                    ))),
                }
            }
            TextFormat::PlainText | TextFormat::Auto => Ok(line),
        }
    }
}

impl<R: BufRead> Iterator for TextRecordReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.max_records.is_some_and(|max| self.emitted >= max) {
            return None;
        }

        loop {
            let line = self.lines.next()?;
            self.line_num += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(GrownetError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to read line {}: {}", self.line_num, e),
                    ))))
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let record = self.parse_line(line);
            if record.is_ok() {
                self.emitted += 1;
            }
            return Some(record);
        }
    }
}

/// Open the corpus a dataset configuration points at.
pub fn open_corpus(config: &DatasetConfig) -> Result<TextRecordReader<BufReader<File>>> {
    let file = File::open(&config.path).map_err(|e| {
        GrownetError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open dataset file {}: {}", config.path.display(), e),
        ))
    })?;

    let format = config.format.resolve(&config.path);
    tracing::info!("Reading {:?} corpus from {}", format, config.path.display());

    Ok(TextRecordReader::new(BufReader::new(file), format, config.text_column.as_str())
        .with_max_records(config.max_records))
}

/// Token source that encodes text records as they are pulled.
pub struct TokenizedSource<I, E> {
    records: I,
    encoder: E,
}

impl<I, E> TokenizedSource<I, E>
where
    I: Iterator<Item = Result<String>>,
    E: TextEncoder,
{
    /// Encode each record of `records` with `encoder`.
    pub fn new(records: I, encoder: E) -> Self {
        Self { records, encoder }
    }

    /// The encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

impl<I, E> TokenSource for TokenizedSource<I, E>
where
    I: Iterator<Item = Result<String>>,
    E: TextEncoder,
{
    fn next_record(&mut self) -> Result<Option<TokenRecord>> {
        match self.records.next() {
            Some(text) => Ok(Some(self.encoder.encode(&text?)?)),
            None => Ok(None),
        }
    }
}
