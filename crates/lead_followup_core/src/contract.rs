use serde::{Deserialize, Serialize};

use crate::lead::Eligibility;

pub const RESPONSE_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
    detail: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches diagnostic text meant for logs. It never reaches the caller.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Caller-facing text.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeAcceptedResponse {
    pub status: String,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkRepliedResponse {
    pub ok: bool,
    pub lead_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySent,
    ManuallyReplied,
    NotYetDue,
    RetryPolicy,
}

impl Eligibility {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Eligible => None,
            Self::AlreadySent => Some(SkipReason::AlreadySent),
            Self::ManuallyReplied => Some(SkipReason::ManuallyReplied),
            Self::NotYetDue { .. } => Some(SkipReason::NotYetDue),
            Self::RetriesExhausted { .. } | Self::BackingOff { .. } => {
                Some(SkipReason::RetryPolicy)
            }
        }
    }
}

/// What one sweep tick did with one enumerated lead id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadOutcome {
    Sent,
    DeliveryFailed,
    Missing,
    Skipped(SkipReason),
    Contended,
    Errored,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: usize,
    pub sent: usize,
    pub delivery_failed: usize,
    pub skipped_missing: usize,
    pub skipped_already_sent: usize,
    pub skipped_manually_replied: usize,
    pub skipped_not_due: usize,
    pub skipped_retry_policy: usize,
    pub skipped_contended: usize,
    pub lead_errors: usize,
}

impl SweepSummary {
    pub fn record(&mut self, outcome: LeadOutcome) {
        self.scanned += 1;
        match outcome {
            LeadOutcome::Sent => self.sent += 1,
            LeadOutcome::DeliveryFailed => self.delivery_failed += 1,
            LeadOutcome::Missing => self.skipped_missing += 1,
            LeadOutcome::Skipped(SkipReason::AlreadySent) => self.skipped_already_sent += 1,
            LeadOutcome::Skipped(SkipReason::ManuallyReplied) => {
                self.skipped_manually_replied += 1
            }
            LeadOutcome::Skipped(SkipReason::NotYetDue) => self.skipped_not_due += 1,
            LeadOutcome::Skipped(SkipReason::RetryPolicy) => self.skipped_retry_policy += 1,
            LeadOutcome::Contended => self.skipped_contended += 1,
            LeadOutcome::Errored => self.lead_errors += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepResponse {
    pub status: SweepStatus,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SweepSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepResponse {
    pub fn complete(summary: SweepSummary) -> Self {
        Self {
            status: SweepStatus::Complete,
            schema_version: RESPONSE_SCHEMA_VERSION.to_string(),
            summary: Some(summary),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: SweepStatus::Error,
            schema_version: RESPONSE_SCHEMA_VERSION.to_string(),
            summary: None,
            error: Some(error.into()),
        }
    }
}
