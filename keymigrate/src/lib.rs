pub mod cancel;
pub mod config;
pub mod errors;
pub mod filters;
pub mod keys;
pub mod metrics;
pub mod migrate;
pub mod results;

pub use cancel::CancellationToken;
pub use config::{CliOverrides, EncodingMode, MigrateConfig};
pub use errors::{MigrateError, MigrateResult};
pub use keys::{KeyEntry, KeyList};
pub use migrate::{migrate, migrate_with_cancel};
pub use results::{MatchRecord, MigrationSummary, SkippedFile, WrittenFile};
