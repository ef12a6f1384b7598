//! Completion listener: turns finished uploads into registry associations.
//!
//! Producers (the hook receiver) push [`CompletedUpload`] notifications into a
//! bounded queue. Exactly one listener task drains it in arrival order and
//! records `file name -> upload id`. Producers wait for room when the queue is
//! full. Failed notifications are logged and dropped; there is no retry.

use crate::metrics;
use satchel_core::CompletedUpload;
use satchel_registry::Registry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Producer handle for the completion queue.
pub type CompletionSender = mpsc::Sender<CompletedUpload>;

/// Create the completion queue with room for `capacity` pending notifications.
pub fn channel(capacity: usize) -> (CompletionSender, mpsc::Receiver<CompletedUpload>) {
    mpsc::channel(capacity.max(1))
}

/// What happened to a single notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The association was written.
    Recorded,
    /// No file name in the upload metadata.
    MissingFileName,
    /// The registry rejected or could not take the write.
    RecordFailed,
}

/// Single consumer of the completion queue.
pub struct CompletionListener {
    registry: Arc<dyn Registry>,
    rx: mpsc::Receiver<CompletedUpload>,
}

impl CompletionListener {
    pub fn new(registry: Arc<dyn Registry>, rx: mpsc::Receiver<CompletedUpload>) -> Self {
        Self { registry, rx }
    }

    /// Drain notifications until every sender has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Completion listener started");
        while let Some(upload) = self.rx.recv().await {
            handle_completion(self.registry.as_ref(), upload).await;
        }
        tracing::info!("Completion queue closed, listener stopping");
    }

    /// Run the listener on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Process one notification against the registry.
pub async fn handle_completion(
    registry: &dyn Registry,
    upload: CompletedUpload,
) -> CompletionOutcome {
    let Some(file_name) = upload.file_name() else {
        tracing::warn!(
            upload_id = %upload.id,
            "Completed upload has no file name in its metadata, discarding"
        );
        metrics::record_discarded_completion("missing_file_name");
        return CompletionOutcome::MissingFileName;
    };

    match registry.record(file_name, &upload.id).await {
        Ok(()) => {
            tracing::info!(
                file_name = %file_name,
                upload_id = %upload.id,
                size = ?upload.size,
                "Recorded completed upload"
            );
            metrics::COMPLETIONS_RECORDED.inc();
            CompletionOutcome::Recorded
        }
        Err(e) => {
            tracing::error!(
                file_name = %file_name,
                upload_id = %upload.id,
                error = %e,
                "Failed to record completed upload, discarding"
            );
            metrics::record_discarded_completion("record_failed");
            CompletionOutcome::RecordFailed
        }
    }
}
