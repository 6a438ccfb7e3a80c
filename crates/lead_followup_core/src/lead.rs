use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

pub const ONE_MINUTE_MS: i64 = 60 * 1000;
pub const FOLLOW_UP_DELAY_MS: i64 = 20 * ONE_MINUTE_MS;

/// One persisted lead. The contact address doubles as the store key.
///
/// `submitted_at` is fixed at construction and `follow_up_sent` only ever
/// moves from false to true; neither has a public setter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    email: String,
    #[serde(default)]
    name: String,
    submitted_at: i64,
    #[serde(default)]
    follow_up_sent: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    manual_reply_sent: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    follow_up_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_attempt_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    follow_up_claimed_at: Option<i64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Lead {
    pub fn new_submission(
        email: impl Into<String>,
        name: impl Into<String>,
        submitted_at_ms: i64,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            submitted_at: submitted_at_ms,
            follow_up_sent: false,
            manual_reply_sent: false,
            follow_up_attempts: 0,
            last_attempt_at: None,
            follow_up_claimed_at: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn submitted_at(&self) -> i64 {
        self.submitted_at
    }

    pub fn follow_up_sent(&self) -> bool {
        self.follow_up_sent
    }

    pub fn manual_reply_sent(&self) -> bool {
        self.manual_reply_sent
    }

    pub fn follow_up_attempts(&self) -> u32 {
        self.follow_up_attempts
    }

    pub fn last_attempt_at(&self) -> Option<i64> {
        self.last_attempt_at
    }

    pub fn follow_up_claimed_at(&self) -> Option<i64> {
        self.follow_up_claimed_at
    }

    pub fn is_due(&self, now_ms: i64, delay_ms: i64) -> bool {
        now_ms.saturating_sub(self.submitted_at) >= delay_ms
    }

    pub fn mark_follow_up_sent(&mut self) {
        self.follow_up_sent = true;
        self.follow_up_claimed_at = None;
    }

    pub fn mark_manual_reply_sent(&mut self) {
        self.manual_reply_sent = true;
    }

    pub fn record_failed_attempt(&mut self, now_ms: i64) {
        self.follow_up_attempts = self.follow_up_attempts.saturating_add(1);
        self.last_attempt_at = Some(now_ms);
        self.follow_up_claimed_at = None;
    }

    pub fn claim(&mut self, now_ms: i64) {
        self.follow_up_claimed_at = Some(now_ms);
    }

    /// A claim older than `lease_ms` belongs to a sweep that died mid-send.
    pub fn has_live_claim(&self, now_ms: i64, lease_ms: i64) -> bool {
        self.follow_up_claimed_at
            .map(|claimed_at| now_ms.saturating_sub(claimed_at) < lease_ms)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpRules {
    pub delay_ms: i64,
    pub retry: RetryPolicy,
}

impl Default for FollowUpRules {
    fn default() -> Self {
        Self {
            delay_ms: FOLLOW_UP_DELAY_MS,
            retry: RetryPolicy::unbounded(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    AlreadySent,
    ManuallyReplied,
    NotYetDue { remaining_ms: i64 },
    RetriesExhausted { attempts: u32 },
    BackingOff { retry_at_ms: i64 },
}

pub fn assess(lead: &Lead, now_ms: i64, rules: &FollowUpRules) -> Eligibility {
    if lead.follow_up_sent {
        return Eligibility::AlreadySent;
    }

    if lead.manual_reply_sent {
        return Eligibility::ManuallyReplied;
    }

    if !lead.is_due(now_ms, rules.delay_ms) {
        let elapsed_ms = now_ms.saturating_sub(lead.submitted_at);
        return Eligibility::NotYetDue {
            remaining_ms: rules.delay_ms.saturating_sub(elapsed_ms),
        };
    }

    if rules.retry.is_exhausted(lead.follow_up_attempts) {
        return Eligibility::RetriesExhausted {
            attempts: lead.follow_up_attempts,
        };
    }

    if let Some(retry_at_ms) = rules
        .retry
        .next_attempt_at(lead.follow_up_attempts, lead.last_attempt_at)
    {
        if now_ms < retry_at_ms {
            return Eligibility::BackingOff { retry_at_ms };
        }
    }

    Eligibility::Eligible
}
