use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info, warn};

use super::aggregator::{Aggregation, Aggregator};
use super::matcher::KeyMatcher;
use super::scanner::FileScanner;
use super::walker::DirectoryWalker;
use super::writer::OutputWriter;
use crate::cancel::CancellationToken;
use crate::config::MigrateConfig;
use crate::errors::{MigrateError, MigrateResult};
use crate::filters::PathFilter;
use crate::keys::KeyList;
use crate::metrics::ScanMetrics;
use crate::results::{MatchRecord, MigrationSummary, ScanOutcome, WalkStats};

/// Paths buffered per worker between the walker and the pool
const WORK_QUEUE_DEPTH: usize = 4;

/// Runs a full migration with no way to cancel it
pub fn migrate(config: &MigrateConfig, keys: &KeyList) -> MigrateResult<MigrationSummary> {
    migrate_with_cancel(config, keys, &CancellationToken::new())
}

/// Scans every source root, aggregates matches and writes the output files.
///
/// Nothing is written until every scanner has finished. A cancelled run
/// returns [`MigrateError::Cancelled`] and leaves the destination untouched.
pub fn migrate_with_cancel(
    config: &MigrateConfig,
    keys: &KeyList,
    cancel: &CancellationToken,
) -> MigrateResult<MigrationSummary> {
    info!(
        "Starting migration of {} source roots into {}",
        config.sources.len(),
        config.destination.display()
    );

    if config.sources.is_empty() {
        return Err(MigrateError::config_error(
            "at least one source root is required",
        ));
    }
    if !config.destination.is_dir() {
        return Err(MigrateError::destination_not_directory(&config.destination));
    }

    let matcher = KeyMatcher::new(keys.active_keys());
    if matcher.is_empty() {
        debug!("Key list has no active keys, nothing to migrate");
        return Ok(MigrationSummary::default());
    }
    debug!("Matching {} active keys", matcher.len());

    let metrics = ScanMetrics::new();
    let scanner = FileScanner::with_metrics(matcher, config.encoding_mode, metrics.clone());
    let walker = DirectoryWalker::new(
        config.sources.clone(),
        PathFilter::new(&config.ignore_patterns),
        config.follow_links,
    );

    let (walk, aggregation, outcomes) = collect(config, walker, &scanner, cancel)?;
    metrics.log_stats();

    if cancel.is_cancelled() {
        warn!("Migration cancelled, no files written");
        return Err(MigrateError::Cancelled);
    }

    let skipped: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ScanOutcome::Skipped(skipped) => Some(skipped),
            _ => None,
        })
        .collect();

    if aggregation.overwritten > 0 {
        info!(
            "{} values were replaced by later matches for the same file and key; \
             which source wins across files is not deterministic",
            aggregation.overwritten
        );
    }

    let written = OutputWriter::new(&config.destination, keys).write_all(&aggregation.table)?;
    let summary = MigrationSummary::new(
        walk,
        metrics.snapshot(),
        aggregation.overwritten,
        written,
        skipped,
    );

    info!(
        "Migration complete. Wrote {} files from {} scanned ({} skipped)",
        summary.files_written(),
        summary.files_scanned,
        summary.skipped.len()
    );
    Ok(summary)
}

/// Collection phase: walker thread → bounded worker pool → single aggregator.
/// Returns once every scanner has finished and the aggregator has drained.
fn collect(
    config: &MigrateConfig,
    walker: DirectoryWalker,
    scanner: &FileScanner,
    cancel: &CancellationToken,
) -> MigrateResult<(WalkStats, Aggregation, Vec<ScanOutcome>)> {
    let workers = config.thread_count.get();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("keymigrate-scan-{i}"))
        .build()
        .map_err(|e| MigrateError::thread_pool(e.to_string()))?;

    let (record_tx, record_rx) = bounded::<MatchRecord>(config.channel_capacity);
    let (path_tx, path_rx) = bounded::<PathBuf>(workers * WORK_QUEUE_DEPTH);

    let aggregator = thread::Builder::new()
        .name("keymigrate-aggregate".to_string())
        .spawn(move || Aggregator::new().drain(record_rx))?;

    let walk_cancel = cancel.clone();
    let walk_handle = thread::Builder::new()
        .name("keymigrate-walk".to_string())
        .spawn(move || walker.walk(&path_tx, &walk_cancel))?;

    debug!("Scanning with {} workers", workers);
    let outcomes: Vec<ScanOutcome> = pool.install(|| {
        path_rx
            .into_iter()
            .par_bridge()
            .map_with(record_tx, |records, path| scanner.scan(&path, records, cancel))
            .collect()
    });

    let walk = walk_handle
        .join()
        .map_err(|_| MigrateError::thread_pool("walker thread panicked"))?;
    let aggregation = aggregator
        .join()
        .map_err(|_| MigrateError::thread_pool("aggregator thread panicked"))?;

    Ok((walk, aggregation, outcomes))
}
