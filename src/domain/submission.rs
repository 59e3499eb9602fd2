use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Status tag written with every persisted record. Delivery outcomes are not written back.
pub const STATUS_RECEIVED: &str = "received";

/// A contact-form entry accepted at the request boundary.
///
/// Fields are private: once accepted a submission is never edited, only recorded and relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    id: Uuid,
    name: String,
    email: String,
    message: String,
    received_at: OffsetDateTime,
}

impl Submission {
    /// Accepts an already-validated submission, stamping it with the current UTC time.
    #[must_use]
    pub fn accept(name: String, email: String, message: String) -> Self {
        Self::accept_at(name, email, message, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn accept_at(name: String, email: String, message: String, received_at: OffsetDateTime) -> Self {
        Self { id: Uuid::new_v4(), name, email, message, received_at }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The UTC calendar day whose partition this submission belongs to.
    #[must_use]
    pub fn partition_date(&self) -> Date {
        self.received_at.to_offset(time::UtcOffset::UTC).date()
    }
}

/// The persisted form of a submission inside a daily partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub name: String,
    pub email: String,
    pub message: String,
    pub status: String,
}

impl From<&Submission> for ContactRecord {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id,
            timestamp: submission.received_at,
            name: submission.name.clone(),
            email: submission.email.clone(),
            message: submission.message.clone(),
            status: STATUS_RECEIVED.to_string(),
        }
    }
}
