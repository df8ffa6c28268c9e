use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ghbackup::config::Overrides;
use ghbackup::updates;
use ghbackup::{DirLayout, ListingScope, RunConfig, Settings, SyncEngine};

#[derive(Parser)]
#[command(name = "ghbackup")]
#[command(about = "Mirror all repositories of a GitHub user or organization")]
#[command(version)]
struct Cli {
    /// Target directory for the mirrors
    directory: Option<String>,

    /// GitHub user or organization
    #[arg(short, long)]
    account: Option<String>,

    /// Token or password, needed for private repositories
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    secret: Option<String>,

    /// Maximum parallel syncs [default: 10]
    #[arg(short, long)]
    workers: Option<usize>,

    /// API base URL, for GitHub Enterprise [default: https://api.github.com]
    #[arg(long)]
    api: Option<String>,

    /// `account` lists the account's repositories, `authenticated` everything the secret can see
    #[arg(long)]
    scope: Option<ListingScope>,

    /// With `--scope authenticated`, keep only repositories owned by the account
    #[arg(long)]
    owner_filter: bool,

    /// Only list repositories the account owns
    #[arg(long)]
    owned_only: bool,

    /// `flat` ({name}.git) or `nested` ({owner}/{name}.git)
    #[arg(long)]
    layout: Option<DirLayout>,

    /// Settings file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List repositories and their target directories without syncing
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    silent: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            directory: self.directory.clone(),
            account: self.account.clone(),
            secret: self.secret.clone(),
            api_url: self.api.clone(),
            workers: self.workers,
            scope: self.scope,
            owner_filter: self.owner_filter,
            owned_only: self.owned_only,
            layout: self.layout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(cli.config.as_deref())?;
    init_logging(cli.verbose, cli.silent, &settings.logging.level)?;
    debug!("Starting ghbackup v{}", env!("CARGO_PKG_VERSION"));

    settings.apply(cli.overrides())?;
    let config = RunConfig::from_settings(&settings)?;
    debug!("Run configuration: {:?}", config);

    let engine = SyncEngine::new(&config).context("Failed to create sync engine")?;

    if cli.dry_run {
        cmd_dry_run(&engine, &config).await
    } else {
        cmd_backup(&engine).await
    }
}

/// Initialize logging: `RUST_LOG`, then the flags, then the settings file
fn init_logging(verbose: bool, silent: bool, level: &str) -> Result<()> {
    let default_level = if silent {
        "error"
    } else if verbose {
        "debug"
    } else {
        level
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level: {}", default_level))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Mirror everything, logging progress as it arrives
async fn cmd_backup(engine: &SyncEngine) -> Result<()> {
    let (tx, rx) = updates::channel();
    let forwarder = tokio::spawn(updates::forward_to_log(rx));

    let result = engine.run(tx).await;
    if let Err(e) = forwarder.await {
        warn!("Update forwarding stopped: {}", e);
    }

    match result {
        Ok(summary) => {
            info!("{}", summary);
            Ok(())
        }
        Err(err) => {
            if let Some(summary) = err.summary() {
                info!("{}", summary);
            }
            Err(err.into())
        }
    }
}

/// Print what would be mirrored where
async fn cmd_dry_run(engine: &SyncEngine, config: &RunConfig) -> Result<()> {
    let repositories = engine
        .discover()
        .await
        .context("Failed to list repositories")?;

    for repo in &repositories {
        println!(
            "{}\t{}\t{}",
            repo,
            if repo.is_private() { "private" } else { "public" },
            repo.local_dir(&config.directory, config.layout).display()
        );
    }
    info!("{} repositories would be mirrored", repositories.len());

    Ok(())
}
