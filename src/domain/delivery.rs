use crate::domain::submission::Submission;
use std::fmt;

/// A fully-formed message ready to hand to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

impl OutboundMessage {
    /// Builds the notification sent to the site owner for a submission.
    #[must_use]
    pub fn for_submission(submission: &Submission, from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            reply_to: Some(submission.email().to_string()),
            subject: format!("New contact form message from {}", submission.name()),
            body: format!(
                "Name: {}\nEmail: {}\n\nMessage:\n{}\n",
                submission.name(),
                submission.email(),
                submission.message()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceOutcome {
    Recorded,
    Failed(String),
}

/// Terminal state of a delivery attempt sequence. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    SkippedDryRun,
    NotConfigured { missing: Vec<&'static str> },
    Failed { attempts: u32, error: String },
}

impl DeliveryOutcome {
    /// Low-cardinality label used for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::SkippedDryRun => "dry_run",
            Self::NotConfigured { .. } => "not_configured",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { attempts } => write!(f, "delivered after {attempts} attempt(s)"),
            Self::SkippedDryRun => f.write_str("skipped (dry-run)"),
            Self::NotConfigured { missing } => write!(f, "not configured (missing {})", missing.join(", ")),
            Self::Failed { attempts, error } => write!(f, "failed after {attempts} attempt(s): {error}"),
        }
    }
}

/// What happened to one submission. Returned by the pipeline instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub persistence: PersistenceOutcome,
    pub delivery: DeliveryOutcome,
}

impl ProcessReport {
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self.persistence, PersistenceOutcome::Recorded)
    }
}
