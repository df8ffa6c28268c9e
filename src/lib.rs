//! ghbackup - Mirror backups of GitHub accounts
//!
//! ghbackup lists every repository of a GitHub user or organization and keeps
//! a bare mirror of each one in a local directory, cloning new repositories and
//! updating existing ones in parallel.
//!
//! ## Modules
//!
//! - [`config`]: Settings file, command line overrides and the validated [`RunConfig`]
//! - [`github`]: Account classification and paginated repository listing
//! - [`discovery`]: The [`Repository`] model and the [`Discovery`] seam
//! - [`git`]: Mirror clone/update through the `git` executable
//! - [`retry`]: Backoff schedules between sync attempts
//! - [`sync`]: The worker pool driving a run
//! - [`summary`]: Per-repository results and their tally
//! - [`mask`]: Secret redaction for every error string
//! - [`updates`]: Progress stream for callers

pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod github;
pub mod mask;
pub mod retry;
pub mod summary;
pub mod sync;
pub mod updates;

pub use config::{Account, RunConfig, Settings};
pub use discovery::{DirLayout, Discovery, GitHubDiscovery, Repository};
pub use error::{ConfigError, ListError, RunError, SyncError};
pub use git::{GitMirror, RepoState, SyncOutcome, Syncer};
pub use github::{GitHubClient, HttpTransport, ListingScope, ReqwestTransport};
pub use mask::SecretMasker;
pub use retry::RetryScheduler;
pub use summary::{RepoSyncResult, RunSummary};
pub use sync::SyncEngine;
pub use updates::Update;
