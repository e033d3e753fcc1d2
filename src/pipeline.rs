use crate::channels::OutputChannels;
use crate::classify::classify;
use crate::config::{LOG_PREVIEW_CHARS, PROGRESS_INTERVAL};
use crate::error::SkipReason;
use crate::extract::extract;
use crate::models::EntityKind;
use crate::parser::DumpReader;
use crate::stats::ExtractionStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct ExtractConfig {
    /// Dump path, or `-` for stdin
    pub input: String,
    pub output_dir: PathBuf,
    pub kinds: Vec<EntityKind>,
    /// Stop after this many input lines
    pub limit: Option<u64>,
    /// Force bzip2 decompression regardless of extension
    pub bz2: bool,
}

pub struct ExtractionSummary {
    pub stats: ExtractionStats,
    pub files: Vec<PathBuf>,
}

fn preview(line: &str) -> String {
    if line.chars().count() <= LOG_PREVIEW_CHARS {
        line.to_string()
    } else {
        let mut cut: String = line.chars().take(LOG_PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

fn log_skip(line_number: u64, line: &str, reason: &SkipReason) {
    match reason {
        SkipReason::NoTypeMarker => {}
        SkipReason::InvalidJson(e) => {
            warn!(line_number, error = %e, line = %preview(line), "Skipping unparsable line");
        }
        other => {
            debug!(line_number, reason = %other, line = %preview(line), "Skipping line");
        }
    }
}

/// Streams every line of `reader` through classify -> extract -> write.
///
/// Malformed lines are logged, counted and skipped; only I/O failures on the input or
/// an output channel end the run.
pub fn process_stream(
    mut reader: DumpReader,
    channels: &mut OutputChannels,
    kinds: &[EntityKind],
    limit: Option<u64>,
) -> Result<ExtractionStats> {
    let mut stats = ExtractionStats::new();
    let pb = ProgressBar::new_spinner();

    for line in reader.by_ref() {
        if limit.is_some_and(|max| stats.lines_read >= max) {
            info!(limit = ?limit, "Line limit reached");
            break;
        }
        let line = line.context("Failed to read dump line")?;
        stats.inc_lines();

        match classify(&line, kinds) {
            Ok(record) => {
                let extracted = extract(&record);
                channels.write_extracted(&extracted)?;
                stats.record_extracted(&extracted);
            }
            Err(reason) => {
                log_skip(stats.lines_read, &line, &reason);
                stats.record_skip(&reason);
            }
        }

        if stats.lines_read % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} records", stats.records()));
            pb.tick();
        }
    }

    pb.finish_and_clear();
    stats.lossy_lines = reader.lossy_lines();
    Ok(stats)
}

/// Runs stages 1-4 over one dump: opens every output channel, streams the input, and
/// closes the channels. Outputs from an earlier run in the same directory are truncated.
pub fn run_extraction(config: &ExtractConfig) -> Result<ExtractionSummary> {
    let reader = DumpReader::open(&config.input, config.bz2)?;
    let mut channels = OutputChannels::open(&config.output_dir, &config.kinds)?;

    info!(input = %config.input, kinds = ?config.kinds, "Starting extraction pass");
    let stats = process_stream(reader, &mut channels, &config.kinds, config.limit)?;
    let files = channels.finish()?;

    info!(
        lines = stats.lines_read,
        editions = stats.editions,
        authors = stats.authors,
        works = stats.works,
        relation_rows = stats.relation_rows,
        malformed = stats.malformed(),
        "Extraction pass complete"
    );

    Ok(ExtractionSummary { stats, files })
}
