//! Sync Engine - Orchestrates parallel repository mirroring
//!
//! Lists repositories once through a [`Discovery`], then hands them to a
//! fixed pool of workers sharing one job queue. Each worker retries its job
//! per the [`RetryScheduler`] and reports exactly one [`RepoSyncResult`] to
//! the [`ResultAggregator`], which runs alongside the pool.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::discovery::{Discovery, GitHubDiscovery, Repository};
use crate::error::{ConfigError, ListError, RunError, SyncError};
use crate::git::{GitMirror, RepoState, Syncer};
use crate::github::{GitHubClient, ReqwestTransport};
use crate::mask::SecretMasker;
use crate::retry::{RetryDecision, RetryScheduler};
use crate::summary::{RepoSyncResult, ResultAggregator, RunSummary};
use crate::updates::{Update, UpdateSender};

/// Number of workers actually started for `jobs` jobs.
pub fn effective_workers(configured: usize, jobs: usize) -> usize {
    configured.min(jobs)
}

/// Runs one backup: list, then sync everything.
pub struct SyncEngine {
    discovery: Arc<dyn Discovery>,
    syncer: Arc<dyn Syncer>,
    retry: RetryScheduler,
    workers: usize,
    masker: SecretMasker,
}

impl SyncEngine {
    /// Engine talking to the GitHub API and the system `git`.
    pub fn new(config: &RunConfig) -> Result<Self, ConfigError> {
        let secret = config.account.secret();
        let transport = Arc::new(ReqwestTransport::new()?);
        let client = GitHubClient::new(
            transport,
            config.api_url.clone(),
            config.account.name(),
            secret,
        );
        let discovery = Arc::new(GitHubDiscovery::new(client, config.listing_request()));
        let syncer = Arc::new(GitMirror::new(
            config.directory.clone(),
            config.layout,
            secret.map(str::to_string),
        ));

        Ok(Self::with_parts(
            discovery,
            syncer,
            config.retry.clone(),
            config.workers,
            SecretMasker::for_secret(secret),
        ))
    }

    pub fn with_parts(
        discovery: Arc<dyn Discovery>,
        syncer: Arc<dyn Syncer>,
        retry: RetryScheduler,
        workers: usize,
        masker: SecretMasker,
    ) -> Self {
        Self {
            discovery,
            syncer,
            retry,
            workers,
            masker,
        }
    }

    /// The frozen repository list. Never retried.
    pub async fn discover(&self) -> Result<Vec<Repository>, ListError> {
        debug!(
            "Discovering repositories from {}",
            self.discovery.provider_name()
        );
        self.discovery.discover().await
    }

    /// List and sync every repository.
    ///
    /// `updates` is dropped before this returns, which closes the stream.
    pub async fn run(&self, updates: UpdateSender) -> Result<RunSummary, RunError> {
        let repositories = self.discover().await?;
        info!("Discovered {} repositories", repositories.len());
        self.sync_all(repositories, updates).await
    }

    /// Sync an already listed set of repositories.
    pub async fn sync_all(
        &self,
        repositories: Vec<Repository>,
        updates: UpdateSender,
    ) -> Result<RunSummary, RunError> {
        let jobs = repositories.len();
        let workers = effective_workers(self.workers, jobs);
        info!("Syncing {} repositories with {} workers", jobs, workers);

        // Every job is queued up front, so workers never wait on the dispatcher.
        let (job_tx, job_rx) = mpsc::channel(jobs.max(1));
        for repository in repositories {
            if job_tx.send(repository).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (result_tx, result_rx) = mpsc::channel(workers.max(1));
        let aggregator = tokio::spawn(ResultAggregator::new(jobs, workers).consume(result_rx));

        let mut pool = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                syncer: self.syncer.clone(),
                retry: self.retry.clone(),
                masker: self.masker.clone(),
                updates: updates.clone(),
            };
            pool.spawn(worker.run());
        }
        drop(result_tx);
        drop(updates);

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("Sync worker died: {}", e);
            }
        }

        let summary = match aggregator.await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Result aggregation died: {}", e);
                RunSummary {
                    failed: jobs,
                    workers,
                    ..RunSummary::default()
                }
            }
        };
        summary.into_result()
    }
}

struct Worker {
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Repository>>>,
    results: mpsc::Sender<RepoSyncResult>,
    syncer: Arc<dyn Syncer>,
    retry: RetryScheduler,
    masker: SecretMasker,
    updates: UpdateSender,
}

impl Worker {
    async fn run(self) {
        loop {
            let next = self.jobs.lock().await.recv().await;
            let Some(repository) = next else {
                break;
            };

            let result = sync_with_retry(
                self.syncer.as_ref(),
                &self.retry,
                &self.masker,
                &self.updates,
                repository,
            )
            .await;

            if self.results.send(result).await.is_err() {
                warn!("Worker {}: result channel closed", self.id);
                break;
            }
        }
        debug!("Worker {} finished", self.id);
    }
}

/// Sync one repository until it succeeds or the schedule says stop.
///
/// Retryable failures are reported as [`Update::Info`], the final one as
/// [`Update::Error`]. Either way the text is masked.
pub async fn sync_with_retry(
    syncer: &dyn Syncer,
    retry: &RetryScheduler,
    masker: &SecretMasker,
    updates: &UpdateSender,
    repository: Repository,
) -> RepoSyncResult {
    let mut attempt = 0;
    loop {
        let attempted = syncer.sync(&repository).await.and_then(|outcome| {
            let verb = match outcome.state {
                RepoState::New => "cloned",
                RepoState::Changed => "updated",
                RepoState::Unchanged => "unchanged",
                // A failure is only reported through the error path.
                RepoState::Failed => return Err(SyncError::FailedState),
            };
            Ok((verb, outcome))
        });
        match attempted {
            Ok((verb, outcome)) => {
                let _ = updates.send(Update::Info(format!(
                    "{} {} ({} objects)",
                    verb, repository, outcome.objects
                )));
                return RepoSyncResult::succeeded(repository, outcome, attempt + 1);
            }
            Err(err) => {
                let message = masker
                    .mask(&format!("cannot sync {}: {}", repository, err))
                    .into_owned();

                match retry.next(attempt) {
                    RetryDecision::Retry(delay) => {
                        let _ = updates.send(Update::Info(format!(
                            "{} (attempt {}, retrying in {:?})",
                            message,
                            attempt + 1,
                            delay
                        )));
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::Stop => {
                        let _ = updates.send(Update::Error(message.clone()));
                        return RepoSyncResult::failed(repository, message, attempt + 1);
                    }
                }
            }
        }
    }
}
