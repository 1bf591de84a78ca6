//! The search-and-aggregate pipeline.
//!
//! ```text
//! walker thread ──paths──▶ rayon pool (FileScanner × N) ──records──▶ aggregator thread
//!                                                                        │
//!                                               AggregatedTable ◀────────┘
//!                                                     │
//!                                               OutputWriter ──▶ <destination>/<filename>
//! ```
//!
//! The walker feeds a bounded work queue so only `thread_count` files are
//! scanned at once. Every scanner owns a clone of the record sender; the
//! aggregator drains the receiving end until the last clone is dropped, which
//! is the point where every scanner has finished. With the default channel
//! capacity of zero each send waits for the aggregator to take the record.
//!
//! Records from one file arrive in line order. Records from different files
//! interleave in scheduling order, so when two files with the same base name
//! both match a key, which value survives can change from run to run. The
//! written output itself always follows key list order.
pub mod aggregator;
pub mod engine;
pub mod matcher;
pub mod scanner;
pub mod walker;
pub mod writer;

pub use aggregator::{AggregatedTable, Aggregation, Aggregator};
pub use engine::{migrate, migrate_with_cancel};
pub use matcher::KeyMatcher;
pub use scanner::FileScanner;
pub use walker::DirectoryWalker;
pub use writer::OutputWriter;
