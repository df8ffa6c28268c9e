//! Per-repository results and the run summary built from them.

use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

use crate::discovery::Repository;
use crate::error::RunError;
use crate::git::{RepoState, SyncOutcome};

/// Exactly one per job, however many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSyncResult {
    pub repository: Repository,
    pub state: RepoState,
    /// Masked cause of the last failed attempt.
    pub error: Option<String>,
    pub attempts: usize,
    pub objects: u64,
}

impl RepoSyncResult {
    pub fn succeeded(repository: Repository, outcome: SyncOutcome, attempts: usize) -> Self {
        Self {
            repository,
            state: outcome.state,
            error: None,
            attempts,
            objects: outcome.objects,
        }
    }

    pub fn failed(repository: Repository, error: String, attempts: usize) -> Self {
        Self {
            repository,
            state: RepoState::Failed,
            error: Some(error),
            attempts,
            objects: 0,
        }
    }
}

/// Tally of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Objects fetched across all repositories.
    pub objects: u64,
    /// Effective worker count.
    pub workers: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.new + self.changed + self.unchanged + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, state: RepoState, objects: u64) {
        match state {
            RepoState::New => self.new += 1,
            RepoState::Changed => self.changed += 1,
            RepoState::Unchanged => self.unchanged += 1,
            RepoState::Failed => self.failed += 1,
        }
        self.objects = self.objects.saturating_add(objects);
    }

    /// `Ok` when nothing failed, otherwise the aggregate error.
    pub fn into_result(self) -> Result<RunSummary, RunError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RunError::Failed {
                failed: self.failed,
                summary: self,
            })
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done: {} new, {} changed, {} unchanged, {} failed, {} total objects",
            self.new, self.changed, self.unchanged, self.failed, self.objects
        )
    }
}

/// Counts results for a known number of jobs.
#[derive(Debug)]
pub struct ResultAggregator {
    expected: usize,
    received: usize,
    summary: RunSummary,
}

impl ResultAggregator {
    pub fn new(expected: usize, workers: usize) -> Self {
        Self {
            expected,
            received: 0,
            summary: RunSummary {
                workers,
                ..RunSummary::default()
            },
        }
    }

    pub fn record(&mut self, result: &RepoSyncResult) {
        if self.received == self.expected {
            warn!("Ignoring unexpected result for {}", result.repository);
            return;
        }
        self.received += 1;
        self.summary.record(result.state, result.objects);
    }

    /// Record results until the channel closes, then finish.
    pub async fn consume(mut self, mut results: mpsc::Receiver<RepoSyncResult>) -> RunSummary {
        while let Some(result) = results.recv().await {
            self.record(&result);
        }
        self.finish()
    }

    /// Jobs that never reported are counted as failed.
    pub fn finish(mut self) -> RunSummary {
        let missing = self.expected - self.received;
        if missing > 0 {
            warn!("{} jobs ended without a result, counting them as failed", missing);
            self.summary.failed += missing;
        }
        self.summary
    }
}
