use crate::adapters::mail::{MailTransport, TransportError};
use crate::adapters::storage::RecordStore;
use crate::config::SmtpConfig;
use crate::domain::delivery::{DeliveryOutcome, OutboundMessage, PersistenceOutcome, ProcessReport};
use crate::domain::submission::Submission;
use crate::services::retry_policy::RetryPolicy;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    submissions_total: Counter<u64>,
    persist_errors_total: Counter<u64>,
    deliveries_total: Counter<u64>,
    delivery_attempts: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("contact-relay");
        Self {
            submissions_total: meter
                .u64_counter("contact_submissions_total")
                .with_description("Total contact submissions processed")
                .build(),
            persist_errors_total: meter
                .u64_counter("contact_persist_errors_total")
                .with_description("Submissions that could not be written to the daily log")
                .build(),
            deliveries_total: meter
                .u64_counter("contact_deliveries_total")
                .with_description("Delivery outcomes by type")
                .build(),
            delivery_attempts: meter
                .u64_histogram("contact_delivery_attempts")
                .with_description("SMTP attempts made per relayed submission")
                .build(),
        }
    }
}

/// Records a submission and relays it to the site owner.
///
/// Persistence and delivery are independent best-effort side effects: a failed write does not
/// prevent sending and vice versa. `process` never fails; what happened is returned as a
/// `ProcessReport`.
#[derive(Clone, Debug)]
pub struct SubmissionService {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn MailTransport>,
    retry: RetryPolicy,
    smtp: SmtpConfig,
    metrics: Metrics,
}

impl SubmissionService {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn MailTransport>,
        retry: RetryPolicy,
        smtp: SmtpConfig,
    ) -> Self {
        Self { store, transport, retry, smtp, metrics: Metrics::new() }
    }

    #[tracing::instrument(skip_all, fields(submission_id = %submission.id(), outcome = tracing::field::Empty))]
    pub async fn process(&self, submission: Submission) -> ProcessReport {
        self.metrics.submissions_total.add(1, &[]);

        let persistence = self.persist(&submission).await;
        let delivery = self.deliver(&submission).await;

        self.metrics.deliveries_total.add(1, &[KeyValue::new("outcome", delivery.label())]);
        tracing::Span::current().record("outcome", delivery.label());

        ProcessReport { persistence, delivery }
    }

    async fn persist(&self, submission: &Submission) -> PersistenceOutcome {
        match self.store.append(submission).await {
            Ok(()) => PersistenceOutcome::Recorded,
            Err(e) => {
                self.metrics.persist_errors_total.add(1, &[]);
                tracing::error!(error = %e, "Failed to save contact");
                PersistenceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn deliver(&self, submission: &Submission) -> DeliveryOutcome {
        // Checked only after persisting so dry-run submissions are still recorded.
        if self.smtp.dry_run {
            tracing::info!(
                name = %submission.name(),
                email = %submission.email(),
                "Dry-run enabled; not sending email, contact saved"
            );
            return DeliveryOutcome::SkippedDryRun;
        }

        let missing = self.smtp.missing_fields();
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "Missing SMTP configuration, email not sent");
            return DeliveryOutcome::NotConfigured { missing };
        }

        let (Some(from), Some(to)) = (self.smtp.sender(), self.smtp.to.as_deref()) else {
            return DeliveryOutcome::NotConfigured { missing: vec!["EMAIL_FROM"] };
        };
        let message = OutboundMessage::for_submission(submission, from, to);

        let outcome =
            self.retry.run(|| self.transport.send(&message), TransportError::is_transient).await;
        self.metrics.delivery_attempts.record(u64::from(outcome.attempts), &[]);

        match outcome.result {
            Ok(()) => {
                tracing::info!(name = %submission.name(), attempts = outcome.attempts, "Email sent successfully");
                DeliveryOutcome::Delivered { attempts: outcome.attempts }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    name = %submission.name(),
                    attempts = outcome.attempts,
                    "Failed to send email"
                );
                DeliveryOutcome::Failed { attempts: outcome.attempts, error: e.to_string() }
            }
        }
    }
}
