//! relocator - Move an application's root data directory.
//!
//! Usage:
//!   relocator show                  Show the current root directory
//!   relocator move DEST [--copy]    Relocate the root directory to DEST
//!   relocator clean PATH            Delete a leftover old root directory
//!   relocator --help                Show help

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use relocator_coordinator::{CleanupOutcome, Coordinator, RelocationRecord, TransferStateKind};
use relocator_core::{PreferenceStore, RelocatorConfig, TransferEngine};
use relocator_engine::{
    CachedPreferenceStore, EventChannel, FilePreferenceStore, FsTransferEngine, TransferOptions,
};

#[derive(Parser)]
#[command(
    name = "relocator",
    version,
    about = "Move an application's root data directory",
    long_about = "relocator moves the root data directory to a new location, optionally \
                  copying the existing contents, and cleans up the old directory once \
                  the new one is in effect."
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current root directory
    Show {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Relocate the root directory
    Move {
        /// New root directory
        destination: PathBuf,

        /// Copy the existing contents into the new directory
        #[arg(short, long)]
        copy: bool,

        /// Delete the old directory after a successful relocation
        #[arg(long)]
        clean: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete an old root directory left behind by a relocation
    Clean {
        /// Directory to delete
        path: PathBuf,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collaborators wired from the config.
struct Session {
    store: Arc<CachedPreferenceStore<FilePreferenceStore>>,
    events: EventChannel,
    engine: Arc<FsTransferEngine>,
}

impl Session {
    fn new(config: &RelocatorConfig) -> Self {
        let store = Arc::new(CachedPreferenceStore::new(FilePreferenceStore::from_config(config)));
        let events = EventChannel::new(config.channel_name.as_str(), config.channel_capacity);
        let engine = Arc::new(FsTransferEngine::new(
            store.clone(),
            events.clone(),
            TransferOptions::from(config),
        ));
        Self {
            store,
            events,
            engine,
        }
    }

    fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.store.clone(), self.store.clone(), self.engine.clone())
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RelocatorConfig::load(path),
        None => RelocatorConfig::load_default(),
    }
    .context("Failed to load config")?;
    tracing::debug!(settings = %config.settings_path.display(), key = %config.preference_key, "Config loaded");
    let session = Session::new(&config);

    match cli.command {
        Command::Show { format } => run_show(&session, format)?,
        Command::Move {
            destination,
            copy,
            clean,
            yes,
            format,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_move(&session, destination, copy, clean, yes, format))?;
        }
        Command::Clean { path, yes } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_clean(&session, &path, yes))?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RELOCATOR_LOG` (default: warnings only).
fn init_logging() {
    let filter = EnvFilter::try_from_env("RELOCATOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the current root directory.
fn run_show(session: &Session, format: OutputFormat) -> Result<()> {
    let root = session.store.get().context("Failed to read root directory")?;

    match format {
        OutputFormat::Text => println!("{}", root.display()),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "key": session.store.key(),
                "root_directory": root,
                "settings": session.store.inner().path(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

/// Stage, confirm and optionally clean up a relocation.
async fn run_move(
    session: &Session,
    destination: PathBuf,
    copy: bool,
    clean: bool,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let coordinator = session.coordinator();
    let subscription = coordinator.listen(session.events.subscribe());

    coordinator.start(&destination)?;
    let record = coordinator.snapshot();
    let from = record
        .previous_directory
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string());

    let action = if copy { "Copy contents and move" } else { "Move" };
    let prompt = format!("{action} root directory {from} -> {}?", destination.display());
    if !yes && !ask(&prompt)? {
        coordinator.reset();
        eprintln!("Aborted.");
        return Ok(());
    }

    let printer = tokio::spawn(print_progress(coordinator.watch()));
    let outcome = coordinator.confirm(copy).await;
    printer.abort();
    eprintln!();

    if outcome? == TransferStateKind::Success && clean {
        match coordinator.clear_old_dir().await {
            CleanupOutcome::Deleted => eprintln!("Removed old directory {from}"),
            CleanupOutcome::Retained => eprintln!("Could not remove old directory {from}, run `relocator clean` later"),
            CleanupOutcome::Skipped => {}
        }
    }

    subscription.shutdown().await;
    let record = coordinator.snapshot();
    print_record(&record, format)?;

    if let Some(message) = record.last_error() {
        bail!("Relocation failed: {message}");
    }
    Ok(())
}

/// Delete a leftover directory through the transfer engine.
async fn run_clean(session: &Session, path: &Path, yes: bool) -> Result<()> {
    if !yes && !ask(&format!("Delete {}?", path.display()))? {
        eprintln!("Aborted.");
        return Ok(());
    }

    session
        .engine
        .delete(path)
        .await
        .context(format!("Failed to delete {}", path.display()))?;
    eprintln!("Removed {}", path.display());
    Ok(())
}

/// Render progress samples on stderr until aborted.
async fn print_progress(mut watch: tokio::sync::watch::Receiver<RelocationRecord>) {
    while watch.changed().await.is_ok() {
        let record = watch.borrow_and_update().clone();
        if record.kind() != TransferStateKind::Loading || record.progress.total_units == 0 {
            continue;
        }
        eprint!(
            "\r Copying {}/{} files ({:.0}%)",
            record.progress.completed_units,
            record.progress.total_units,
            record.progress.fraction() * 100.0
        );
        let _ = std::io::stderr().flush();
    }
}

fn print_record(record: &RelocationRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!(" State:     {}", record.kind());
            if let Some(dir) = &record.previous_directory {
                println!(" Root:      {}", dir.display());
            }
            if let Some(dir) = record.target_directory() {
                println!(" Target:    {}", dir.display());
            }
            if let Some(dir) = record.pending_delete_directory() {
                println!(" Old dir:   {} (not deleted)", dir.display());
            }
            if let Some(message) = record.last_error() {
                println!(" Error:     {message}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
    }
    Ok(())
}

/// Ask a yes/no question on stdin.
fn ask(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
