//! Error taxonomy.
//!
//! [`ConfigError`] and [`ListError`] end the run before any repository is
//! touched. [`SyncError`] stays inside a worker: it is retried, then turned
//! into a failed result. [`RunError`] is what a whole run returns.

use std::path::PathBuf;

use thiserror::Error;

use crate::summary::RunSummary;

/// Invalid or missing startup input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either an account or a secret must be given")]
    MissingAccountOrSecret,

    #[error("the target directory must not be empty")]
    MissingDirectory,

    #[error("invalid API URL `{url}`: {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("invalid duration `{0}` (use e.g. 500ms, 30s, 5m, 1h)")]
    Duration(String),

    #[error("{0}")]
    Invalid(String),

    #[error("cannot expand path `{path}`: {reason}")]
    Expand { path: String, reason: String },
}

/// Failure while classifying the account or listing its repositories.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("cannot get {url}: {message}")]
    Transport { url: String, message: String },

    #[error("bad response from {url}: {status}")]
    Status { url: String, status: u16 },

    #[error("cannot decode JSON response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot get user info for {account}: {source}")]
    Lookup {
        account: String,
        #[source]
        source: Box<ListError>,
    },

    #[error("unknown type of account {kind} for {account}")]
    UnknownCategory { kind: String, account: String },

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("refusing repository `{path}`: {reason}")]
    InvalidRepository { path: String, reason: String },
}

/// Failure of one clone or update attempt. Messages are already masked.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{action} `{}`: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error running command `{command}` ({status}): {output}")]
    Command {
        command: String,
        status: String,
        output: String,
    },

    #[error("cannot add credentials to clone URL `{url}`")]
    CloneUrl { url: String },

    #[error("sync reported a failed state")]
    FailedState,
}

/// Outcome of a run that did not fully succeed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    List(#[from] ListError),

    /// Some repositories failed after exhausting their retries.
    #[error("failed to get {failed} repositories")]
    Failed { failed: usize, summary: RunSummary },
}

impl RunError {
    /// The summary of a run that got as far as syncing.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Failed { summary, .. } => Some(summary),
            _ => None,
        }
    }
}
