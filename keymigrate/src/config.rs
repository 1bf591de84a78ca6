use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::MigrateResult;

/// Marker that starts a comment line in the key list
pub const DEFAULT_COMMENT_MARKER: &str = "#";

/// How to handle invalid UTF-8 sequences in source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Stop scanning the file and report it as skipped
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    #[default]
    Lossy,
}

impl EncodingMode {
    /// Parses the CLI spelling of an encoding mode
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "failfast" | "fail-fast" => Some(Self::FailFast),
            "lossy" => Some(Self::Lossy),
            _ => None,
        }
    }
}

/// Values given explicitly on the command line.
/// `None` (or empty) means the option was absent and the file value stands.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub sources: Vec<PathBuf>,
    pub destination: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub channel_capacity: Option<usize>,
    pub comment_marker: Option<String>,
    pub ignore_patterns: Vec<String>,
    pub follow_links: bool,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

/// Configuration for a migration run.
///
/// # Configuration Locations
///
/// Values are layered in order of precedence, later sources winning:
/// 1. Global `$HOME/.config/keymigrate/config.yaml`
/// 2. Local `.keymigrate.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line arguments override all of them, see [`MigrateConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Source roots (files or directories)
/// sources: ["legacy/locales"]
///
/// # Existing directory receiving the rewritten files
/// destination: "locales"
///
/// # Worker threads scanning files (default: CPU cores)
/// thread_count: 8
///
/// # Records buffered between scanners and the aggregator (0 = hand-off)
/// channel_capacity: 0
///
/// # Key list lines starting with this marker are copied verbatim
/// comment_marker: "#"
///
/// # Glob patterns of source paths to skip
/// ignore_patterns: ["**/*.bak"]
///
/// follow_links: false
/// encoding_mode: lossy
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Source roots to scan; each may be a file or a directory
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Directory receiving one output file per matched source base name.
    /// Must already exist.
    #[serde(default)]
    pub destination: PathBuf,

    /// Number of scanner threads in the worker pool
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Capacity of the record channel between scanners and the aggregator.
    /// Zero makes every send a rendezvous with the aggregator.
    #[serde(default)]
    pub channel_capacity: usize,

    /// Prefix identifying comment entries in the key list
    #[serde(default = "default_comment_marker")]
    pub comment_marker: String,

    /// Glob patterns of source paths to skip
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links while walking source roots
    #[serde(default)]
    pub follow_links: bool,

    /// Handling of invalid UTF-8 in source files
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_comment_marker() -> String {
    DEFAULT_COMMENT_MARKER.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: PathBuf::new(),
            thread_count: default_thread_count(),
            channel_capacity: 0,
            comment_marker: default_comment_marker(),
            ignore_patterns: Vec::new(),
            follow_links: false,
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl MigrateConfig {
    /// Creates a configuration for the given roots and destination with defaults elsewhere
    pub fn new(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations plus an optional explicit file.
    /// An explicit file that does not exist is an error.
    pub fn load_from(config_path: Option<&Path>) -> MigrateResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("keymigrate/config.yaml")),
            Some(PathBuf::from(".keymigrate.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Merges CLI arguments with configuration file values.
    /// Every option given on the command line wins, even when it equals the default.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if !cli.sources.is_empty() {
            self.sources = cli.sources;
        }
        if let Some(destination) = cli.destination {
            self.destination = destination;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(channel_capacity) = cli.channel_capacity {
            self.channel_capacity = channel_capacity;
        }
        if let Some(comment_marker) = cli.comment_marker {
            self.comment_marker = comment_marker;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if cli.follow_links {
            self.follow_links = true;
        }
        if let Some(encoding_mode) = cli.encoding_mode {
            self.encoding_mode = encoding_mode;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            sources: ["legacy/en", "legacy/fr"]
            destination: "out"
            thread_count: 4
            channel_capacity: 16
            comment_marker: ";"
            ignore_patterns: ["**/*.bak"]
            follow_links: true
            encoding_mode: failfast
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = MigrateConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(
            config.sources,
            vec![PathBuf::from("legacy/en"), PathBuf::from("legacy/fr")]
        );
        assert_eq!(config.destination, PathBuf::from("out"));
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.comment_marker, ";");
        assert_eq!(config.ignore_patterns, vec!["**/*.bak".to_string()]);
        assert!(config.follow_links);
        assert_eq!(config.encoding_mode, EncodingMode::FailFast);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "destination: \"out\"\n").unwrap();

        let config = MigrateConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.destination, PathBuf::from("out"));
        assert_eq!(config.channel_capacity, 0);
        assert_eq!(config.comment_marker, "#");
        assert!(config.ignore_patterns.is_empty());
        assert!(!config.follow_links);
        assert_eq!(config.encoding_mode, EncodingMode::Lossy);
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = MigrateConfig {
            sources: vec![PathBuf::from("legacy")],
            destination: PathBuf::from("out"),
            thread_count: NonZeroUsize::new(2).unwrap(),
            channel_capacity: 8,
            comment_marker: ";".to_string(),
            ignore_patterns: vec!["*.bak".to_string()],
            follow_links: false,
            encoding_mode: EncodingMode::FailFast,
            log_level: "info".to_string(),
        };

        let cli = CliOverrides {
            sources: vec![PathBuf::from("src")],
            destination: Some(PathBuf::from("dst")),
            follow_links: true,
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.sources, vec![PathBuf::from("src")]); // CLI value
        assert_eq!(merged.destination, PathBuf::from("dst")); // CLI value
        assert_eq!(merged.thread_count, NonZeroUsize::new(2).unwrap()); // File value
        assert_eq!(merged.channel_capacity, 8); // File value
        assert_eq!(merged.comment_marker, ";"); // File value
        assert_eq!(merged.ignore_patterns, vec!["*.bak".to_string()]); // File value
        assert!(merged.follow_links); // CLI value
        assert_eq!(merged.encoding_mode, EncodingMode::FailFast); // File value
        assert_eq!(merged.log_level, "info"); // File value
    }

    #[test]
    fn test_cli_default_values_override_file() {
        let file_config = MigrateConfig {
            thread_count: NonZeroUsize::new(2).unwrap(),
            channel_capacity: 8,
            comment_marker: ";".to_string(),
            encoding_mode: EncodingMode::FailFast,
            log_level: "info".to_string(),
            ..MigrateConfig::new(vec![PathBuf::from("legacy")], "out")
        };

        let cpus = NonZeroUsize::new(num_cpus::get()).unwrap();
        let cli = CliOverrides {
            thread_count: Some(cpus),
            channel_capacity: Some(0),
            comment_marker: Some(DEFAULT_COMMENT_MARKER.to_string()),
            encoding_mode: Some(EncodingMode::Lossy),
            log_level: Some("warn".to_string()),
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.thread_count, cpus);
        assert_eq!(merged.channel_capacity, 0);
        assert_eq!(merged.comment_marker, "#");
        assert_eq!(merged.encoding_mode, EncodingMode::Lossy);
        assert_eq!(merged.log_level, "warn");
        assert_eq!(merged.sources, vec![PathBuf::from("legacy")]);
        assert_eq!(merged.destination, PathBuf::from("out"));
    }

    #[test]
    fn test_encoding_mode_parse() {
        assert_eq!(EncodingMode::parse("lossy"), Some(EncodingMode::Lossy));
        assert_eq!(EncodingMode::parse("FailFast"), Some(EncodingMode::FailFast));
        assert_eq!(EncodingMode::parse("fail-fast"), Some(EncodingMode::FailFast));
        assert_eq!(EncodingMode::parse("utf16"), None);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "thread_count: \"many\"\n").unwrap();

        assert!(MigrateConfig::load_from(Some(&config_path)).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = MigrateConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }
}
