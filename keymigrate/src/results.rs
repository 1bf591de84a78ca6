use serde::Serialize;
use std::path::PathBuf;

use crate::errors::MigrateResult;
use crate::metrics::MetricsSnapshot;

/// A single source line matched by a key, on its way to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// The active key that prefixes the line
    pub key: String,
    /// The full line, without its line ending
    pub value: String,
    /// Base name of the source file, used as the output file name
    pub filename: String,
}

impl MatchRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            filename: filename.into(),
        }
    }
}

/// How a single file scan ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The whole file was read
    Scanned { path: PathBuf, matches: usize },
    /// The file could not be opened or read to the end
    Skipped(SkippedFile),
    /// Scanning stopped because the run was cancelled
    Cancelled { path: PathBuf },
}

/// A source file that contributed fewer records than it would have if fully read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// An output file produced by the writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Number of lines written, pass-through lines included
    pub lines: usize,
}

/// Counters from the directory walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Regular files handed to the worker pool
    pub files_discovered: u64,
    /// Entries that could not be listed or inspected
    pub errors: u64,
}

/// Outcome of a completed migration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    pub files_discovered: u64,
    pub files_scanned: u64,
    pub walk_errors: u64,
    pub lines_read: u64,
    pub records: u64,
    /// Records that replaced an earlier, different value for the same file and key
    pub overwritten: u64,
    pub written: Vec<WrittenFile>,
    pub skipped: Vec<SkippedFile>,
}

impl MigrationSummary {
    pub(crate) fn new(
        walk: WalkStats,
        metrics: MetricsSnapshot,
        overwritten: u64,
        written: Vec<WrittenFile>,
        mut skipped: Vec<SkippedFile>,
    ) -> Self {
        skipped.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            files_discovered: walk.files_discovered,
            files_scanned: metrics.files_scanned,
            walk_errors: walk.errors,
            lines_read: metrics.lines_read,
            records: metrics.records_sent,
            overwritten,
            written,
            skipped,
        }
    }

    pub fn files_written(&self) -> usize {
        self.written.len()
    }

    pub fn to_json(&self) -> MigrateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
