use crossbeam_channel::Sender;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::matcher::KeyMatcher;
use crate::cancel::CancellationToken;
use crate::config::EncodingMode;
use crate::errors::{MigrateError, MigrateResult};
use crate::keys::strip_line_ending;
use crate::metrics::ScanMetrics;
use crate::results::{MatchRecord, ScanOutcome, SkippedFile};

const BUFFER_CAPACITY: usize = 8192;

#[derive(Debug, Default)]
struct ScanCounts {
    lines: u64,
    records: u64,
}

/// Scans single source files for lines prefixed by an active key
#[derive(Debug)]
pub struct FileScanner {
    matcher: KeyMatcher,
    encoding_mode: EncodingMode,
    metrics: ScanMetrics,
}

impl FileScanner {
    pub fn new(matcher: KeyMatcher, encoding_mode: EncodingMode) -> Self {
        Self::with_metrics(matcher, encoding_mode, ScanMetrics::new())
    }

    pub fn with_metrics(
        matcher: KeyMatcher,
        encoding_mode: EncodingMode,
        metrics: ScanMetrics,
    ) -> Self {
        Self {
            matcher,
            encoding_mode,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Scans one file, sending every match to `sink` in line order.
    ///
    /// Never fails: a file that cannot be opened or read to the end is
    /// reported as [`ScanOutcome::Skipped`], keeping any records already sent.
    pub fn scan(
        &self,
        path: &Path,
        sink: &Sender<MatchRecord>,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        trace!("Scanning file: {}", path.display());
        let mut counts = ScanCounts::default();
        let result = self.scan_lines(path, sink, cancel, &mut counts);

        self.metrics.record_lines(counts.lines);
        self.metrics.record_sent(counts.records);

        match result {
            Ok(true) => {
                self.metrics.record_file_scanned();
                debug!(
                    "Found {} matches in {} lines of {}",
                    counts.records,
                    counts.lines,
                    path.display()
                );
                ScanOutcome::Scanned {
                    path: path.to_path_buf(),
                    matches: counts.records as usize,
                }
            }
            Ok(false) => {
                debug!("Scan of {} cancelled", path.display());
                ScanOutcome::Cancelled {
                    path: path.to_path_buf(),
                }
            }
            Err(e) => {
                self.metrics.record_file_skipped();
                warn!("Skipping {}: {}", path.display(), e);
                ScanOutcome::Skipped(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Returns `Ok(false)` when cancelled before the end of the file
    fn scan_lines(
        &self,
        path: &Path,
        sink: &Sender<MatchRecord>,
        cancel: &CancellationToken,
        counts: &mut ScanCounts,
    ) -> MigrateResult<bool> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                MigrateError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path has no file name",
                ))
            })?;

        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut buffer = Vec::with_capacity(256);

        loop {
            if cancel.is_cancelled() {
                return Ok(false);
            }

            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                return Ok(true);
            }
            counts.lines += 1;

            let bytes = strip_line_ending(std::mem::take(&mut buffer));
            let line = self.decode(&bytes, path)?;

            for key in self.matcher.matching_keys(&line) {
                trace!("{}: {}", filename, line);
                let record = MatchRecord::new(key, &*line, filename.as_str());
                sink.send(record).map_err(|_| {
                    MigrateError::Io(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "record channel closed",
                    ))
                })?;
                counts.records += 1;
            }

            buffer = bytes;
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8], path: &Path) -> MigrateResult<Cow<'a, str>> {
        match self.encoding_mode {
            EncodingMode::FailFast => match std::str::from_utf8(bytes) {
                Ok(line) => Ok(Cow::Borrowed(line)),
                // rebuild as FromUtf8Error so the error carries the offending bytes
                Err(_) => String::from_utf8(bytes.to_vec())
                    .map(Cow::Owned)
                    .map_err(|e| MigrateError::encoding(path, e)),
            },
            EncodingMode::Lossy => {
                let cow = String::from_utf8_lossy(bytes);
                if let Cow::Owned(_) = cow {
                    warn!("Invalid UTF-8 replaced in file: {}", path.display());
                }
                Ok(cow)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;
    use tempfile::tempdir;

    fn scan_file(
        scanner: &FileScanner,
        path: &Path,
    ) -> (ScanOutcome, Vec<MatchRecord>) {
        let (tx, rx) = unbounded();
        let outcome = scanner.scan(path, &tx, &CancellationToken::new());
        drop(tx);
        (outcome, rx.iter().collect())
    }

    #[test]
    fn test_scan_emits_records_in_line_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "GREETING=hello\nOTHER=x\nFAREWELL=bye\nGREETING=hi\n").unwrap();

        let scanner = FileScanner::new(
            KeyMatcher::new(["GREETING", "FAREWELL"]),
            EncodingMode::Lossy,
        );
        let (outcome, records) = scan_file(&scanner, &path);

        assert!(matches!(outcome, ScanOutcome::Scanned { matches: 3, .. }));
        assert_eq!(
            records,
            vec![
                MatchRecord::new("GREETING", "GREETING=hello", "a.txt"),
                MatchRecord::new("FAREWELL", "FAREWELL=bye", "a.txt"),
                MatchRecord::new("GREETING", "GREETING=hi", "a.txt"),
            ]
        );

        let stats = scanner.metrics().snapshot();
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.records_sent, 3);
        assert_eq!(stats.files_scanned, 1);
    }

    #[test]
    fn test_line_matching_several_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fr.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "app.title=Bonjour\r\n").unwrap();

        let scanner = FileScanner::new(KeyMatcher::new(["app", "app.title"]), EncodingMode::Lossy);
        let (_, records) = scan_file(&scanner, &path);

        assert_eq!(
            records,
            vec![
                MatchRecord::new("app", "app.title=Bonjour", "fr.txt"),
                MatchRecord::new("app.title", "app.title=Bonjour", "fr.txt"),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let scanner = FileScanner::new(KeyMatcher::new(["KEY"]), EncodingMode::Lossy);
        let (outcome, records) = scan_file(&scanner, &path);

        assert!(records.is_empty());
        match outcome {
            ScanOutcome::Skipped(skipped) => assert_eq!(skipped.path, path),
            other => panic!("expected skipped outcome, got {other:?}"),
        }
        assert_eq!(scanner.metrics().snapshot().files_skipped, 1);
    }

    #[test]
    fn test_invalid_utf8_lossy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"KEY=caf\xe9\n").unwrap();

        let scanner = FileScanner::new(KeyMatcher::new(["KEY"]), EncodingMode::Lossy);
        let (outcome, records) = scan_file(&scanner, &path);

        assert!(matches!(outcome, ScanOutcome::Scanned { matches: 1, .. }));
        assert_eq!(records[0].value, "KEY=caf\u{FFFD}");
    }

    #[test]
    fn test_invalid_utf8_fail_fast_keeps_earlier_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"KEY=ok\nKEY=caf\xe9\nKEY=late\n").unwrap();

        let scanner = FileScanner::new(KeyMatcher::new(["KEY"]), EncodingMode::FailFast);
        let (outcome, records) = scan_file(&scanner, &path);

        assert!(matches!(outcome, ScanOutcome::Skipped(_)));
        assert_eq!(records, vec![MatchRecord::new("KEY", "KEY=ok", "latin1.txt")]);
    }

    #[test]
    fn test_cancelled_scan_sends_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "KEY=1\n").unwrap();

        let scanner = FileScanner::new(KeyMatcher::new(["KEY"]), EncodingMode::Lossy);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, rx) = unbounded();
        let outcome = scanner.scan(&path, &tx, &cancel);
        drop(tx);

        assert!(matches!(outcome, ScanOutcome::Cancelled { .. }));
        assert_eq!(rx.iter().count(), 0);
    }
}
