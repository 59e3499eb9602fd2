use crate::domain::delivery::{DeliveryOutcome, PersistenceOutcome, ProcessReport};
use crate::domain::submission::Submission;
use crate::services::submission_service::SubmissionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Runs submissions in the background, detached from the request that accepted them.
///
/// At most `concurrency` submissions are processed at once; the rest wait for a permit.
#[derive(Clone, Debug)]
pub struct SubmissionDispatcher {
    service: SubmissionService,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl SubmissionDispatcher {
    #[must_use]
    pub fn new(service: SubmissionService, concurrency: usize) -> Self {
        Self { service, semaphore: Arc::new(Semaphore::new(concurrency.max(1))), tracker: TaskTracker::new() }
    }

    /// Schedules `submission` and returns immediately.
    pub fn dispatch(&self, submission: Submission) {
        let service = self.service.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let span = tracing::info_span!("process_submission", submission_id = %submission.id());

        self.tracker.spawn(
            async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    tracing::warn!("Dispatcher closed, submission dropped");
                    return;
                };

                let report = service.process(submission).await;
                log_report(&report);
            }
            .instrument(span),
        );
    }

    /// Waits until every dispatched submission has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Waits up to `timeout` for in-flight submissions, used once the listeners have stopped.
    ///
    /// Returns `false` if some submissions were still running when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight submissions");
        }

        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            tracing::info!("Submission dispatcher drained");
            true
        } else {
            tracing::warn!(pending = self.tracker.len(), "Timeout waiting for in-flight submissions");
            false
        }
    }
}

fn log_report(report: &ProcessReport) {
    match (&report.persistence, &report.delivery) {
        (PersistenceOutcome::Recorded, DeliveryOutcome::Delivered { .. } | DeliveryOutcome::SkippedDryRun) => {
            tracing::info!(delivery = %report.delivery, "Contact processed successfully");
        }
        (PersistenceOutcome::Failed(e), _) => {
            tracing::warn!(error = %e, delivery = %report.delivery, "Contact processed without a saved record");
        }
        _ => {
            tracing::warn!(delivery = %report.delivery, "Contact saved but not delivered");
        }
    }
}
