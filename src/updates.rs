//! Progress stream from the sync engine to whoever drives it.

use tokio::sync::mpsc;
use tracing::{error, info};

/// One progress message. Text is already masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Info(String),
    Error(String),
}

pub type UpdateSender = mpsc::UnboundedSender<Update>;
pub type UpdateReceiver = mpsc::UnboundedReceiver<Update>;

/// New update stream. The engine closes it by dropping the sender once the
/// last result is in.
pub fn channel() -> (UpdateSender, UpdateReceiver) {
    mpsc::unbounded_channel()
}

/// Forward every update to `tracing` until the stream closes.
pub async fn forward_to_log(mut updates: UpdateReceiver) {
    while let Some(update) = updates.recv().await {
        match update {
            Update::Info(message) => info!("{}", message),
            Update::Error(message) => error!("{}", message),
        }
    }
}

/// Drain a closed stream into a vector.
pub async fn collect(mut updates: UpdateReceiver) -> Vec<Update> {
    let mut collected = Vec::new();
    while let Some(update) = updates.recv().await {
        collected.push(update);
    }
    collected
}
