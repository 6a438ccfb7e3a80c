//! Scheduled follow-up sweep.
//!
//! Each tick enumerates every lead id and handles each lead on its own:
//! read, decide, send, then commit `followUpSent` only after the notifier
//! confirms delivery. A failure on one lead never affects another. In
//! conditional mode the lead is first claimed with a compare-and-swap write so
//! overlapping sweeps do not both send.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use lead_followup_core::contract::{LeadOutcome, SweepResponse, SweepSummary};
use lead_followup_core::lead::{assess, FollowUpRules, Lead};

use crate::adapters::lead_store::{ConditionalPut, LeadStore, LeadVersion, StoreError};
use crate::adapters::notifier::{DeliveryOutcome, FollowUpNotifier};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_CLAIM_LEASE_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub now_ms: i64,
    pub rules: FollowUpRules,
    pub send_timeout: Duration,
    pub max_concurrency: usize,
    pub conditional_writes: bool,
    pub claim_lease_ms: i64,
}

impl SweepConfig {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms,
            rules: FollowUpRules::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            conditional_writes: false,
            claim_lease_ms: DEFAULT_CLAIM_LEASE_MS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("failed to enumerate leads: {0}")]
    Enumerate(#[source] StoreError),
}

/// Entry point for the scheduled trigger. `notifier` is `None` when the email
/// API key is missing; the tick then reports an error without touching leads.
pub async fn handle_sweep_trigger(
    store: &dyn LeadStore,
    notifier: Option<&dyn FollowUpNotifier>,
    config: &SweepConfig,
) -> SweepResponse {
    let Some(notifier) = notifier else {
        tracing::error!(
            component = "follow_up_sweep",
            event = "sweep_misconfigured",
            "email API key is not configured"
        );
        return SweepResponse::error("Follow-up check error: notifier is not configured");
    };

    match run_sweep(store, notifier, config).await {
        Ok(summary) => SweepResponse::complete(summary),
        Err(error) => {
            tracing::error!(
                component = "follow_up_sweep",
                event = "sweep_aborted",
                error = %error,
            );
            SweepResponse::error("Follow-up check error")
        }
    }
}

pub async fn run_sweep(
    store: &dyn LeadStore,
    notifier: &dyn FollowUpNotifier,
    config: &SweepConfig,
) -> Result<SweepSummary, SweepError> {
    let started_at = Instant::now();
    let conditional = config.conditional_writes && store.supports_conditional_writes();
    if config.conditional_writes && !conditional {
        tracing::warn!(
            component = "follow_up_sweep",
            event = "conditional_writes_unavailable",
            "store has no compare-and-swap; falling back to last-write-wins"
        );
    }
    tracing::info!(
        component = "follow_up_sweep",
        event = "sweep_started",
        now_ms = config.now_ms,
        conditional,
    );

    let mut summary = SweepSummary::default();
    let mut continuation = None;
    loop {
        let page = store
            .list_ids_page(continuation)
            .await
            .map_err(SweepError::Enumerate)?;

        let outcomes: Vec<LeadOutcome> = stream::iter(page.ids)
            .map(|id| process_lead(store, notifier, config, conditional, id))
            .buffer_unordered(config.max_concurrency.max(1))
            .collect()
            .await;
        for outcome in outcomes {
            summary.record(outcome);
        }

        match page.next {
            Some(next) => continuation = Some(next),
            None => break,
        }
    }

    tracing::info!(
        component = "follow_up_sweep",
        event = "sweep_completed",
        duration_ms = started_at.elapsed().as_millis() as u64,
        scanned = summary.scanned,
        sent = summary.sent,
        delivery_failed = summary.delivery_failed,
        lead_errors = summary.lead_errors,
    );
    Ok(summary)
}

async fn process_lead(
    store: &dyn LeadStore,
    notifier: &dyn FollowUpNotifier,
    config: &SweepConfig,
    conditional: bool,
    id: String,
) -> LeadOutcome {
    match follow_up_lead(store, notifier, config, conditional, &id).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(
                component = "follow_up_sweep",
                event = "lead_failed",
                error = %error,
            );
            LeadOutcome::Errored
        }
    }
}

async fn follow_up_lead(
    store: &dyn LeadStore,
    notifier: &dyn FollowUpNotifier,
    config: &SweepConfig,
    conditional: bool,
    id: &str,
) -> Result<LeadOutcome, StoreError> {
    let Some(stored) = store.get(id).await? else {
        return Ok(LeadOutcome::Missing);
    };
    let mut lead = stored.lead;
    let mut version = stored.version;

    if let Some(reason) = assess(&lead, config.now_ms, &config.rules).skip_reason() {
        return Ok(LeadOutcome::Skipped(reason));
    }

    if conditional {
        if lead.has_live_claim(config.now_ms, config.claim_lease_ms) {
            return Ok(LeadOutcome::Contended);
        }
        lead.claim(config.now_ms);
        match store.put_if_version(id, &lead, &version).await? {
            ConditionalPut::Written(claimed_version) => version = claimed_version,
            ConditionalPut::Conflict => return Ok(LeadOutcome::Contended),
        }
    }

    let delivery = match tokio::time::timeout(
        config.send_timeout,
        notifier.send_follow_up(lead.email(), lead.name()),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => DeliveryOutcome::Failed(format!(
            "send timed out after {}ms",
            config.send_timeout.as_millis()
        )),
    };

    match delivery {
        DeliveryOutcome::Delivered => {
            lead.mark_follow_up_sent();
            commit(store, id, &lead, conditional.then_some(&version)).await?;
            tracing::info!(
                component = "follow_up_sweep",
                event = "follow_up_sent",
                submitted_at = lead.submitted_at(),
            );
            Ok(LeadOutcome::Sent)
        }
        DeliveryOutcome::Failed(reason) => {
            tracing::warn!(
                component = "follow_up_sweep",
                event = "follow_up_delivery_failed",
                attempts = lead.follow_up_attempts() + 1,
                reason = %reason,
            );
            if conditional || config.rules.retry.records_attempts() {
                lead.record_failed_attempt(config.now_ms);
                commit(store, id, &lead, conditional.then_some(&version)).await?;
            }
            Ok(LeadOutcome::DeliveryFailed)
        }
    }
}

/// Writes the lead back, guarded by `expected` in conditional mode. A
/// conflict there means the record was replaced after our claim (usually a
/// fresh submission), which must win.
async fn commit(
    store: &dyn LeadStore,
    id: &str,
    lead: &Lead,
    expected: Option<&LeadVersion>,
) -> Result<(), StoreError> {
    let Some(expected) = expected else {
        return store.put(id, lead).await;
    };

    if let ConditionalPut::Conflict = store.put_if_version(id, lead, expected).await? {
        tracing::warn!(
            component = "follow_up_sweep",
            event = "lead_replaced_during_send",
            "lead changed after it was claimed; leaving the newer record in place"
        );
    }
    Ok(())
}
