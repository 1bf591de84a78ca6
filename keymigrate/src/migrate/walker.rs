use crossbeam_channel::Sender;
use ignore::{DirEntry, WalkBuilder};
use std::path::PathBuf;
use tracing::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::filters::PathFilter;
use crate::results::WalkStats;

/// Enumerates regular files under each source root and queues them for scanning.
///
/// Hidden files and VCS ignore rules get no special treatment: every regular
/// file reachable from a root is queued unless an ignore pattern excludes it.
/// A symlink to a regular file is queued; symlinked directories are only
/// descended into when `follow_links` is set.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    roots: Vec<PathBuf>,
    filter: PathFilter,
    follow_links: bool,
}

impl DirectoryWalker {
    pub fn new(roots: Vec<PathBuf>, filter: PathFilter, follow_links: bool) -> Self {
        Self {
            roots,
            filter,
            follow_links,
        }
    }

    /// Walks every root, sending file paths to `queue` as they are found.
    ///
    /// Listing errors are logged and counted but never stop the walk. Returns
    /// early if cancelled or if the queue has no receiver left.
    pub fn walk(&self, queue: &Sender<PathBuf>, cancel: &CancellationToken) -> WalkStats {
        let mut stats = WalkStats::default();

        for root in &self.roots {
            debug!("Walking {}", root.display());
            let mut builder = WalkBuilder::new(root);
            builder
                .standard_filters(false)
                .follow_links(self.follow_links);
            if !self.filter.is_empty() {
                let filter = self.filter.clone();
                builder.filter_entry(move |entry| !filter.should_ignore(entry.path()));
            }

            for entry in builder.build() {
                if cancel.is_cancelled() {
                    debug!("Walk cancelled after {} files", stats.files_discovered);
                    return stats;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable path under {}: {}", root.display(), e);
                        stats.errors += 1;
                        continue;
                    }
                };

                if !is_scannable(&entry) {
                    continue;
                }

                trace!("Queueing {}", entry.path().display());
                if queue.send(entry.into_path()).is_err() {
                    debug!("Work queue closed, stopping walk");
                    return stats;
                }
                stats.files_discovered += 1;
            }
        }

        debug!(
            "Walk finished: {} files, {} errors",
            stats.files_discovered, stats.errors
        );
        stats
    }
}

fn is_scannable(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(ft) if ft.is_symlink() => entry.path().is_file(),
        _ => false,
    }
}
