use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

use crate::discovery::{DirLayout, Repository};
use crate::error::SyncError;
use crate::mask::SecretMasker;

/// Classification of one repository's sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoState {
    /// No local mirror existed; the clone succeeded.
    New,
    /// The update fetched new objects or moved refs.
    Changed,
    /// The update found nothing new.
    Unchanged,
    /// Every attempt failed.
    Failed,
}

/// Successful clone or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub state: RepoState,
    /// Objects git reported transferring.
    pub objects: u64,
}

/// One attempt at bringing a repository's mirror up to date.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Syncer: Send + Sync {
    /// Error text in the returned error is already masked.
    async fn sync(&self, repository: &Repository) -> Result<SyncOutcome, SyncError>;
}

/// Exit status and combined stdout/stderr of a git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub output: String,
}

/// Runs the git executable.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[String], cwd: &Path) -> std::io::Result<CommandOutput>;
}

/// [`GitRunner`] spawning the `git` found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[String], cwd: &Path) -> std::io::Result<CommandOutput> {
        let output = AsyncCommand::new(&self.program)
            .args(args)
            .current_dir(cwd)
            // Fail instead of waiting for a password on stdin.
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: combined,
        })
    }
}

/// Keeps bare mirrors of repositories under a target directory.
pub struct GitMirror {
    runner: Arc<dyn GitRunner>,
    target: PathBuf,
    layout: DirLayout,
    secret: Option<String>,
    masker: SecretMasker,
}

impl GitMirror {
    /// Mirror using the system `git`.
    pub fn new(target: PathBuf, layout: DirLayout, secret: Option<String>) -> Self {
        Self::with_runner(Arc::new(SystemGit::default()), target, layout, secret)
    }

    pub fn with_runner(
        runner: Arc<dyn GitRunner>,
        target: PathBuf,
        layout: DirLayout,
        secret: Option<String>,
    ) -> Self {
        let masker = SecretMasker::for_secret(secret.as_deref());
        Self {
            runner,
            target,
            layout,
            secret,
            masker,
        }
    }

    /// Local mirror directory of `repository`.
    pub fn repo_dir(&self, repository: &Repository) -> PathBuf {
        repository.local_dir(&self.target, self.layout)
    }

    /// Clone URL, with the secret as user info for private repositories.
    pub fn clone_url(&self, repository: &Repository) -> Result<String, SyncError> {
        let secret = match (&self.secret, repository.is_private()) {
            (Some(secret), true) => secret,
            _ => return Ok(repository.clone_url().to_string()),
        };

        let invalid = || SyncError::CloneUrl {
            url: self.masker.mask(repository.clone_url()).into_owned(),
        };
        let mut url = Url::parse(repository.clone_url()).map_err(|_| invalid())?;
        url.set_username(secret).map_err(|_| invalid())?;
        Ok(url.to_string())
    }

    async fn clone_mirror(
        &self,
        repository: &Repository,
        dir: &Path,
    ) -> Result<SyncOutcome, SyncError> {
        debug!("Cloning {} into {}", repository, dir.display());

        let parent = dir.parent().unwrap_or(self.target.as_path());
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SyncError::Io {
                action: "cannot create directory",
                path: parent.to_path_buf(),
                source,
            })?;

        let args = vec![
            "clone".to_string(),
            "--mirror".to_string(),
            "--no-checkout".to_string(),
            "--progress".to_string(),
            self.clone_url(repository)?,
            // git runs inside `parent`, so the destination is relative to it.
            dir.file_name()
                .map_or_else(|| dir.to_string_lossy(), |name| name.to_string_lossy())
                .into_owned(),
        ];

        match self.run_git(&args, parent).await {
            Ok(output) => Ok(SyncOutcome {
                state: RepoState::New,
                objects: parse_transfer(&output).objects,
            }),
            Err(err) => {
                self.remove_partial_clone(dir).await;
                Err(err)
            }
        }
    }

    async fn update_mirror(
        &self,
        repository: &Repository,
        dir: &Path,
    ) -> Result<SyncOutcome, SyncError> {
        debug!("Updating {} in {}", repository, dir.display());

        let args = vec!["remote".to_string(), "update".to_string()];
        let output = self.run_git(&args, dir).await?;
        let report = parse_transfer(&output);

        let state = if report.has_changes() {
            RepoState::Changed
        } else {
            RepoState::Unchanged
        };
        Ok(SyncOutcome {
            state,
            objects: report.objects,
        })
    }

    /// Run git and turn spawn failures and non-zero exits into masked errors.
    async fn run_git(&self, args: &[String], cwd: &Path) -> Result<String, SyncError> {
        let command = || self.masker.mask(&format!("git {}", args.join(" "))).into_owned();

        let output = self
            .runner
            .run(args, cwd)
            .await
            .map_err(|source| SyncError::Spawn {
                command: command(),
                source,
            })?;

        if !output.success {
            return Err(SyncError::Command {
                command: command(),
                status: output.status,
                output: self.masker.mask(output.output.trim()).into_owned(),
            });
        }
        Ok(output.output)
    }

    async fn remove_partial_clone(&self, dir: &Path) {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => debug!("Removed partial clone {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot remove partial clone {}: {}", dir.display(), e),
        }
    }
}

#[async_trait]
impl Syncer for GitMirror {
    async fn sync(&self, repository: &Repository) -> Result<SyncOutcome, SyncError> {
        let dir = self.repo_dir(repository);
        let exists = tokio::fs::try_exists(&dir)
            .await
            .map_err(|source| SyncError::Io {
                action: "cannot check if repo exists",
                path: dir.clone(),
                source,
            })?;

        if exists {
            self.update_mirror(repository, &dir).await
        } else {
            self.clone_mirror(repository, &dir).await
        }
    }
}

/// What a clone or fetch reported transferring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub objects: u64,
    pub ref_updates: usize,
}

impl TransferReport {
    pub fn has_changes(&self) -> bool {
        self.objects > 0 || self.ref_updates > 0
    }
}

/// Scan git clone/fetch output for the object count and ref updates.
///
/// Understands output such as:
///
/// ```text
/// Fetching origin
/// remote: Enumerating objects: 5, done.
/// remote: Total 5 (delta 3), reused 3 (delta 3), pack-reused 2
/// Unpacking objects: 100% (5/5), done.
/// From https://github.com/owner/repo
///    3f2a1c9..8b7d6e0  main       -> main
/// ```
pub fn parse_transfer(output: &str) -> TransferReport {
    static RECEIVED: OnceLock<Option<Regex>> = OnceLock::new();
    static TOTAL: OnceLock<Option<Regex>> = OnceLock::new();
    static COUNTED: OnceLock<Option<Regex>> = OnceLock::new();
    static REF_UPDATE: OnceLock<Option<Regex>> = OnceLock::new();

    let count_from = |re: Option<&Regex>| {
        re.into_iter()
            .flat_map(|re| re.captures_iter(output))
            .filter_map(|c| c.get(1)?.as_str().parse::<u64>().ok())
            .max()
    };
    let objects = count_from(cached(&RECEIVED, RECEIVED_PATTERN))
        .or_else(|| count_from(cached(&TOTAL, TOTAL_PATTERN)))
        .or_else(|| count_from(cached(&COUNTED, COUNTED_PATTERN)))
        .unwrap_or(0);

    let ref_update = cached(&REF_UPDATE, REF_UPDATE_PATTERN);
    let ref_updates = output
        .split(['\n', '\r'])
        .filter(|line| ref_update.is_some_and(|re| re.is_match(line)))
        .count();

    TransferReport {
        objects,
        ref_updates,
    }
}

const RECEIVED_PATTERN: &str = r"(?:Receiving|Unpacking) objects:\s+\d+% \(\d+/(\d+)\)";
const TOTAL_PATTERN: &str = r"remote: Total (\d+)";
const COUNTED_PATTERN: &str = r"remote: (?:Counting|Enumerating) objects: (\d+)";
const REF_UPDATE_PATTERN: &str = r"^\s*[+\-*t!]?\s*(?:\[new [^\]]+\]|\[deleted\]|\[tag update\]|[0-9a-f]{4,}\.\.\.?[0-9a-f]{4,})\s+.*->";

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}
