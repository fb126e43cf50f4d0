//! buildwatch: dispatch test jobs for finished builds.
//!
//! - `listen`: consume build notifications (stdin JSON lines, or replayed
//!   files with `--push-message`) and trigger the configured test jobs
//! - `ondemand`: trigger testruns for explicitly listed release builds

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use buildwatch_core::app::{AppBuilder, ondemand};
use buildwatch_core::config::Config;
use buildwatch_core::impls::{DryRunTrigger, FileArchive, FileSource, JenkinsTrigger, LineSource};
use buildwatch_core::ports::{JobTrigger, NotificationSource, SystemClock, UlidGenerator};

// ── CLI ─────────────────────────────────────────────────────────────

/// Build notification dispatcher.
#[derive(Parser, Debug)]
#[command(name = "buildwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for build notifications and trigger test jobs.
    Listen {
        /// Path to the JSON configuration file.
        config: PathBuf,

        /// Verbose logging and archiving of every build notification.
        #[arg(long, env = "BUILDWATCH_DEBUG")]
        debug: bool,

        /// Where notifications are archived in debug mode.
        #[arg(long, env = "BUILDWATCH_LOG_FOLDER", default_value = "log")]
        log_folder: PathBuf,

        /// Replay saved notifications instead of reading stdin.
        #[arg(long = "push-message", value_name = "FILE")]
        push_message: Vec<PathBuf>,

        /// Log jobs instead of triggering them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Trigger testruns for the builds listed in an on-demand config.
    Ondemand {
        /// Path to the on-demand JSON configuration file.
        config: PathBuf,

        /// Log jobs instead of triggering them.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Command {
    fn debug(&self) -> bool {
        matches!(self, Command::Listen { debug: true, .. })
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.command.debug() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Listen {
            config,
            debug,
            log_folder,
            push_message,
            dry_run,
        } => listen(config, debug, log_folder, push_message, dry_run).await,
        Command::Ondemand { config, dry_run } => run_ondemand(config, dry_run).await,
    }
}

async fn listen(
    config_path: PathBuf,
    debug: bool,
    log_folder: PathBuf,
    push_message: Vec<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(path = %config_path.display(), "loaded configuration");

    let mut builder = AppBuilder::new(config);
    if dry_run {
        builder = builder.trigger(Arc::new(DryRunTrigger));
    }
    if debug {
        info!(folder = %log_folder.display(), "debug mode, archiving build notifications");
        builder = builder.archive(Arc::new(FileArchive::new(log_folder)));
    }
    let app = builder.build()?;

    let source: Arc<dyn NotificationSource> = if push_message.is_empty() {
        info!(subscription = %app.subscription(), "reading notifications from stdin");
        Arc::new(LineSource::stdin()?)
    } else {
        Arc::new(FileSource::new(push_message))
    };
    let ids = Arc::new(UlidGenerator::new(SystemClock));
    let listener = app.listener(source, ids);

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                let _ = stop.send(true);
            }
            Err(e) => warn!(error = %e, "unable to listen for interrupt"),
        }
    });

    let summary = listener.run(shutdown).await?;
    info!(
        received = summary.received,
        accepted = summary.accepted,
        triggered = summary.triggered,
        failed = summary.failed,
        "buildwatch exited cleanly"
    );
    Ok(())
}

async fn run_ondemand(config_path: PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let config = ondemand::OnDemandConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let trigger: Box<dyn JobTrigger> = if dry_run {
        Box::new(DryRunTrigger)
    } else {
        Box::new(JenkinsTrigger::new(&config.jenkins)?)
    };
    let ids = UlidGenerator::new(SystemClock);

    let summary = ondemand::run(&config, trigger.as_ref(), &ids).await;
    if summary.failed > 0 {
        anyhow::bail!("{} of {} jobs failed to trigger", summary.failed, summary.triggered + summary.failed);
    }
    Ok(())
}
