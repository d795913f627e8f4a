use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::report::{MetricReport, MetricValue};

/// Reads flat `key value [trailing...]` statistics reports.
///
/// The parser never fails on an individual line: lines with fewer than two
/// tokens are skipped and values that are not numbers are kept as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsParser;

/// Line counters gathered during one parse, used for logging only
#[derive(Debug, Default)]
struct LineCounts {
    entries: usize,
    skipped: usize,
    text_values: usize,
}

impl StatsParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a report held in memory
    pub fn parse_str(&self, source: &str, text: &str) -> MetricReport {
        let mut entries = HashMap::new();
        let mut counts = LineCounts::default();
        for line in text.lines() {
            Self::parse_line(line, &mut entries, &mut counts);
        }
        Self::finish(source, entries, counts)
    }

    /// Parse a report from any buffered reader.
    ///
    /// Only read errors are returned; the content itself cannot make the
    /// parse fail.
    pub fn parse_reader<R: BufRead>(&self, source: &str, reader: R) -> io::Result<MetricReport> {
        let mut entries = HashMap::new();
        let mut counts = LineCounts::default();
        for line in reader.lines() {
            let line = line?;
            Self::parse_line(&line, &mut entries, &mut counts);
        }
        Ok(Self::finish(source, entries, counts))
    }

    /// Parse the report stored at `path`
    pub fn parse_file(&self, path: &Path) -> Result<MetricReport> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ReportNotFound(path.to_path_buf()),
            _ => Error::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let source = path.display().to_string();
        self.parse_reader(&source, BufReader::new(file))
            .map_err(|e| Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn parse_line(
        line: &str,
        entries: &mut HashMap<String, MetricValue>,
        counts: &mut LineCounts,
    ) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        let mut tokens = trimmed.split_whitespace();
        let (key, token) = match (tokens.next(), tokens.next()) {
            (Some(key), Some(token)) => (key, token),
            _ => {
                counts.skipped += 1;
                return;
            }
        };

        let value = MetricValue::parse(token);
        if !value.is_numeric() {
            debug!("{}: value '{}' is not numeric, stored as text", key, token);
            counts.text_values += 1;
        }

        // Later occurrences replace earlier ones
        entries.insert(key.to_string(), value);
        counts.entries += 1;
    }

    fn finish(
        source: &str,
        entries: HashMap<String, MetricValue>,
        counts: LineCounts,
    ) -> MetricReport {
        info!(
            "Parsed {}: {} keys from {} lines ({} skipped, {} text values)",
            source,
            entries.len(),
            counts.entries,
            counts.skipped,
            counts.text_values
        );
        MetricReport::new(source.to_string(), entries)
    }
}
