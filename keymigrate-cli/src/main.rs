use clap::Parser;
use colored::Colorize;
use keymigrate::{
    migrate_with_cancel, CancellationToken, CliOverrides, EncodingMode, KeyList, MigrateConfig,
    MigrateError, MigrationSummary,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, MigrateError>;

/// Copy key-prefixed lines from source files into DST, ordered and filtered by the KEYS file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source files or directories, then the destination directory, then the key list file
    #[arg(value_name = "SRC... DST KEYS", num_args = 3.., required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of files scanned in parallel
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Glob patterns of source paths to skip
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Key list lines starting with this marker are copied verbatim
    #[arg(long)]
    comment_marker: Option<String>,

    /// How to handle invalid UTF-8 in source files (failfast|lossy)
    #[arg(long)]
    encoding: Option<String>,

    /// Records buffered between scanners and the aggregator (0 = hand-off)
    #[arg(long)]
    channel_capacity: Option<usize>,

    /// Follow symbolic links to directories
    #[arg(long)]
    follow_links: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Print nothing on success
    #[arg(short, long)]
    quiet: bool,
}

struct Inputs {
    sources: Vec<PathBuf>,
    destination: PathBuf,
    keys: PathBuf,
}

impl Cli {
    fn inputs(&self) -> Inputs {
        let mut paths = self.paths.clone();
        let keys = paths.pop().unwrap_or_default();
        let destination = paths.pop().unwrap_or_default();
        Inputs {
            sources: paths,
            destination,
            keys,
        }
    }

    fn overrides(&self, inputs: &Inputs) -> Result<CliOverrides> {
        let encoding_mode = self
            .encoding
            .as_deref()
            .map(|value| {
                EncodingMode::parse(value).ok_or_else(|| {
                    MigrateError::config_error(format!(
                        "Unknown encoding '{}', expected failfast or lossy",
                        value
                    ))
                })
            })
            .transpose()?;

        Ok(CliOverrides {
            sources: inputs.sources.clone(),
            destination: Some(inputs.destination.clone()),
            thread_count: self.threads,
            channel_capacity: self.channel_capacity,
            comment_marker: self.comment_marker.clone(),
            ignore_patterns: self.ignore.clone(),
            follow_links: self.follow_links,
            encoding_mode,
            log_level: self.log_level.clone(),
        })
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let inputs = cli.inputs();
    check_inputs(&inputs)?;

    let overrides = cli.overrides(&inputs)?;
    let config = MigrateConfig::load_from(cli.config.as_deref())?.merge_with_cli(overrides);
    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let keys = KeyList::load(&inputs.keys, &config.comment_marker)?;
    let cancel = install_interrupt_handler()?;

    let summary = migrate_with_cancel(&config, &keys, &cancel)?;

    if cli.json {
        println!("{}", summary.to_json()?);
    } else if !cli.quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Every path must exist and the destination must be a directory
fn check_inputs(inputs: &Inputs) -> Result<()> {
    let all = inputs
        .sources
        .iter()
        .chain([&inputs.destination, &inputs.keys]);
    for path in all {
        if !path.exists() {
            return Err(MigrateError::source_not_found(path));
        }
    }
    if !inputs.destination.is_dir() {
        return Err(MigrateError::destination_not_directory(&inputs.destination));
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// First Ctrl+C stops the run before anything is written, a second one exits immediately
fn install_interrupt_handler() -> Result<CancellationToken> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            eprintln!("\nForce stopping...");
            std::process::exit(130);
        }
        eprintln!("\nStopping... (press Ctrl+C again to force exit)");
        handler_token.cancel();
    })
    .map_err(|e| MigrateError::config_error(format!("Failed to set signal handler: {}", e)))?;
    Ok(cancel)
}

fn print_summary(summary: &MigrationSummary) {
    for file in &summary.written {
        println!(
            "{} {} ({} lines)",
            "wrote".green(),
            file.path.display(),
            file.lines
        );
    }
    for skipped in &summary.skipped {
        println!(
            "{} {}: {}",
            "skipped".yellow(),
            skipped.path.display(),
            skipped.reason
        );
    }
    if summary.overwritten > 0 {
        println!(
            "{} {} values matched more than once; the last one aggregated was kept",
            "note:".blue(),
            summary.overwritten
        );
    }

    println!(
        "\nMigrated {} files from {} scanned ({} skipped, {} walk errors)",
        summary.files_written(),
        summary.files_scanned,
        summary.skipped.len(),
        summary.walk_errors
    );
}
