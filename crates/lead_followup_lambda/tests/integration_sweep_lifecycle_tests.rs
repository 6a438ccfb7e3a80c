mod support;

use std::time::Duration;

use lead_followup_core::contract::SweepStatus;
use lead_followup_core::lead::Lead;
use lead_followup_core::retry::RetryPolicy;
use lead_followup_lambda::adapters::lead_store::LeadStore;
use lead_followup_lambda::adapters::memory_store::InMemoryLeadStore;
use lead_followup_lambda::handlers::sweep::{handle_sweep_trigger, run_sweep, SweepConfig};
use support::notifier::ScriptedNotifier;
use support::store::FaultyStore;
use support::{minutes, raw_bytes, seed_lead, stored_lead, T0};

#[tokio::test]
async fn due_lead_is_sent_once_and_flagged() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let notifier = ScriptedNotifier::delivering();

    let summary = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(25)))
        .await
        .expect("sweep should complete");

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(
        notifier.attempts(),
        vec![("a@x.com".to_string(), "Ann".to_string())]
    );
    let lead = stored_lead(&store, "a@x.com").await;
    assert!(lead.follow_up_sent());
    assert_eq!(lead.submitted_at(), T0);
}

#[tokio::test]
async fn lead_inside_the_window_is_left_untouched() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let before = raw_bytes(&store, "a@x.com");
    let notifier = ScriptedNotifier::delivering();

    let summary = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(10)))
        .await
        .expect("sweep should complete");

    assert_eq!(summary.skipped_not_due, 1);
    assert!(notifier.attempts().is_empty());
    assert_eq!(raw_bytes(&store, "a@x.com"), before);
}

#[tokio::test]
async fn twenty_minute_gate_is_inclusive() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "early@x.com", "", T0 - minutes(20) + 1).await;
    seed_lead(&store, "exact@x.com", "", T0 - minutes(20)).await;
    let notifier = ScriptedNotifier::delivering();

    let summary = run_sweep(&store, &notifier, &SweepConfig::at(T0))
        .await
        .expect("sweep should complete");

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.skipped_not_due, 1);
    assert_eq!(notifier.attempted_emails(), vec!["exact@x.com".to_string()]);
}

#[tokio::test]
async fn failed_delivery_leaves_record_untouched_and_retries_next_tick() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let before = raw_bytes(&store, "a@x.com");
    let notifier = ScriptedNotifier::delivering().failing_for("a@x.com");

    let first = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(25)))
        .await
        .expect("sweep should complete");
    assert_eq!(first.delivery_failed, 1);
    assert_eq!(raw_bytes(&store, "a@x.com"), before);

    let second = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(30)))
        .await
        .expect("sweep should complete");
    assert_eq!(second.delivery_failed, 1);
    assert_eq!(notifier.attempts().len(), 2);
    assert!(!stored_lead(&store, "a@x.com").await.follow_up_sent());
}

#[tokio::test]
async fn sent_lead_is_never_sent_again() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let notifier = ScriptedNotifier::delivering();

    run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(25)))
        .await
        .expect("first sweep should complete");
    let after_send = raw_bytes(&store, "a@x.com");
    let second = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(60)))
        .await
        .expect("second sweep should complete");

    assert_eq!(second.skipped_already_sent, 1);
    assert_eq!(notifier.attempts().len(), 1);
    assert_eq!(raw_bytes(&store, "a@x.com"), after_send);
}

#[tokio::test]
async fn manually_replied_lead_is_excluded() {
    let store = InMemoryLeadStore::new();
    let mut lead = Lead::new_submission("a@x.com", "Ann", T0);
    lead.mark_manual_reply_sent();
    store.put("a@x.com", &lead).await.expect("seed should succeed");
    let notifier = ScriptedNotifier::delivering();

    let summary = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(25)))
        .await
        .expect("sweep should complete");

    assert_eq!(summary.skipped_manually_replied, 1);
    assert!(notifier.attempts().is_empty());
}

#[tokio::test]
async fn one_bad_lead_does_not_stop_the_others() {
    let inner = InMemoryLeadStore::new();
    seed_lead(&inner, "ok@x.com", "Ok", T0).await;
    seed_lead(&inner, "unreadable@x.com", "", T0).await;
    seed_lead(&inner, "bounced@x.com", "", T0).await;
    seed_lead(&inner, "unwritable@x.com", "", T0).await;
    inner
        .insert_raw("corrupt@x.com", b"{not json")
        .expect("seed should succeed");
    let store = FaultyStore::new(inner)
        .failing_reads_for("unreadable@x.com")
        .failing_writes_for("unwritable@x.com")
        .with_phantom_id("deleted@x.com");
    let notifier = ScriptedNotifier::delivering().failing_for("bounced@x.com");

    let summary = run_sweep(&store, &notifier, &SweepConfig::at(T0 + minutes(25)))
        .await
        .expect("sweep should complete");

    assert_eq!(summary.scanned, 6);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.delivery_failed, 1);
    assert_eq!(summary.skipped_missing, 1);
    // unreadable, corrupt, and the send whose flag write failed
    assert_eq!(summary.lead_errors, 3);
    assert!(stored_lead(store.inner(), "ok@x.com").await.follow_up_sent());
    assert!(
        !stored_lead(store.inner(), "unwritable@x.com")
            .await
            .follow_up_sent()
    );
}

#[tokio::test]
async fn listing_failure_reports_error_status() {
    let inner = InMemoryLeadStore::new();
    seed_lead(&inner, "a@x.com", "Ann", T0).await;
    let store = FaultyStore::new(inner).failing_listing();
    let notifier = ScriptedNotifier::delivering();

    let response = handle_sweep_trigger(
        &store,
        Some(&notifier),
        &SweepConfig::at(T0 + minutes(25)),
    )
    .await;

    assert_eq!(response.status, SweepStatus::Error);
    assert!(response.summary.is_none());
    assert!(notifier.attempts().is_empty());
}

#[tokio::test]
async fn trigger_reports_summary_on_success() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let notifier = ScriptedNotifier::delivering();

    let response = handle_sweep_trigger(
        &store,
        Some(&notifier),
        &SweepConfig::at(T0 + minutes(25)),
    )
    .await;

    assert_eq!(response.status, SweepStatus::Complete);
    assert_eq!(response.summary.map(|summary| summary.sent), Some(1));
}

#[tokio::test(start_paused = true)]
async fn hung_send_times_out_without_blocking_other_leads() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "slow@x.com", "", T0).await;
    seed_lead(&store, "fast@x.com", "", T0).await;
    let before = raw_bytes(&store, "slow@x.com");
    let notifier = ScriptedNotifier::delivering().hanging_for("slow@x.com");
    let config = SweepConfig {
        send_timeout: Duration::from_secs(10),
        ..SweepConfig::at(T0 + minutes(25))
    };

    let summary = run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.delivery_failed, 1);
    assert_eq!(raw_bytes(&store, "slow@x.com"), before);
    assert!(stored_lead(&store, "fast@x.com").await.follow_up_sent());
}

#[tokio::test]
async fn bounded_retries_stop_after_max_attempts() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let notifier = ScriptedNotifier::delivering().failing_for("a@x.com");
    let mut config = SweepConfig::at(T0 + minutes(25));
    config.rules.retry = RetryPolicy {
        max_attempts: Some(2),
        ..RetryPolicy::default()
    };

    for tick in 0..3 {
        config.now_ms = T0 + minutes(25 + tick);
        run_sweep(&store, &notifier, &config)
            .await
            .expect("sweep should complete");
    }
    config.now_ms = T0 + minutes(30);
    let summary = run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");

    assert_eq!(notifier.attempts().len(), 2);
    assert_eq!(summary.skipped_retry_policy, 1);
    let lead = stored_lead(&store, "a@x.com").await;
    assert_eq!(lead.follow_up_attempts(), 2);
    assert_eq!(lead.last_attempt_at(), Some(T0 + minutes(26)));
    assert!(!lead.follow_up_sent());
}

#[tokio::test]
async fn backoff_defers_the_next_attempt() {
    let store = InMemoryLeadStore::new();
    seed_lead(&store, "a@x.com", "Ann", T0).await;
    let notifier = ScriptedNotifier::delivering().failing_for("a@x.com");
    let mut config = SweepConfig::at(T0 + minutes(25));
    config.rules.retry = RetryPolicy {
        backoff_base_ms: minutes(5) as u64,
        ..RetryPolicy::default()
    };

    run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");

    config.now_ms = T0 + minutes(27);
    let deferred = run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");
    assert_eq!(deferred.skipped_retry_policy, 1);
    assert_eq!(notifier.attempts().len(), 1);

    config.now_ms = T0 + minutes(30);
    let retried = run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");
    assert_eq!(retried.delivery_failed, 1);
    assert_eq!(notifier.attempts().len(), 2);
}

#[tokio::test]
async fn enumerates_every_page() {
    let store = InMemoryLeadStore::with_page_size(2);
    for index in 0..5 {
        seed_lead(&store, &format!("lead{index}@x.com"), "", T0).await;
    }
    let notifier = ScriptedNotifier::delivering();
    let config = SweepConfig {
        max_concurrency: 1,
        ..SweepConfig::at(T0 + minutes(25))
    };

    let summary = run_sweep(&store, &notifier, &config)
        .await
        .expect("sweep should complete");

    assert_eq!(summary.scanned, 5);
    assert_eq!(summary.sent, 5);
    assert_eq!(notifier.attempted_emails().len(), 5);
}

mod conditional_mode {
    use super::*;

    fn conditional_config(now_ms: i64) -> SweepConfig {
        SweepConfig {
            conditional_writes: true,
            ..SweepConfig::at(now_ms)
        }
    }

    #[tokio::test]
    async fn claims_then_commits_without_leaving_a_claim() {
        let store = InMemoryLeadStore::new();
        seed_lead(&store, "a@x.com", "Ann", T0).await;
        let notifier = ScriptedNotifier::delivering();

        let summary = run_sweep(&store, &notifier, &conditional_config(T0 + minutes(25)))
            .await
            .expect("sweep should complete");

        assert_eq!(summary.sent, 1);
        let lead = stored_lead(&store, "a@x.com").await;
        assert!(lead.follow_up_sent());
        assert_eq!(lead.follow_up_claimed_at(), None);
    }

    #[tokio::test]
    async fn live_claim_from_another_sweep_is_respected() {
        let store = InMemoryLeadStore::new();
        let mut lead = Lead::new_submission("a@x.com", "Ann", T0);
        lead.claim(T0 + minutes(24));
        store.put("a@x.com", &lead).await.expect("seed should succeed");
        let notifier = ScriptedNotifier::delivering();

        let summary = run_sweep(&store, &notifier, &conditional_config(T0 + minutes(25)))
            .await
            .expect("sweep should complete");

        assert_eq!(summary.skipped_contended, 1);
        assert!(notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn expired_claim_is_taken_over() {
        let store = InMemoryLeadStore::new();
        let mut lead = Lead::new_submission("a@x.com", "Ann", T0);
        lead.claim(T0 + minutes(21));
        store.put("a@x.com", &lead).await.expect("seed should succeed");
        let notifier = ScriptedNotifier::delivering();

        let summary = run_sweep(&store, &notifier, &conditional_config(T0 + minutes(40)))
            .await
            .expect("sweep should complete");

        assert_eq!(summary.sent, 1);
    }

    #[tokio::test]
    async fn losing_the_claim_race_skips_the_send() {
        let inner = InMemoryLeadStore::new();
        seed_lead(&inner, "a@x.com", "Ann", T0).await;
        let mut rival = Lead::new_submission("a@x.com", "Ann", T0);
        rival.claim(T0 + minutes(25));
        let store = FaultyStore::new(inner).overwriting_before_conditional_put(1, rival);
        let notifier = ScriptedNotifier::delivering();

        let summary = run_sweep(&store, &notifier, &conditional_config(T0 + minutes(25)))
            .await
            .expect("sweep should complete");

        assert_eq!(summary.skipped_contended, 1);
        assert!(notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn resubmission_during_send_is_not_overwritten() {
        let inner = InMemoryLeadStore::new();
        seed_lead(&inner, "a@x.com", "Ann", T0).await;
        let resubmitted = Lead::new_submission("a@x.com", "Ann B.", T0 + minutes(24));
        let store =
            FaultyStore::new(inner).overwriting_before_conditional_put(2, resubmitted.clone());
        let notifier = ScriptedNotifier::delivering();

        let summary = run_sweep(&store, &notifier, &conditional_config(T0 + minutes(25)))
            .await
            .expect("sweep should complete");

        assert_eq!(summary.sent, 1);
        assert_eq!(stored_lead(store.inner(), "a@x.com").await, resubmitted);
    }

    #[tokio::test]
    async fn failed_send_records_attempt_and_releases_claim() {
        let store = InMemoryLeadStore::new();
        seed_lead(&store, "a@x.com", "Ann", T0).await;
        let notifier = ScriptedNotifier::delivering().failing_for("a@x.com");

        run_sweep(&store, &notifier, &conditional_config(T0 + minutes(25)))
            .await
            .expect("sweep should complete");

        let lead = stored_lead(&store, "a@x.com").await;
        assert_eq!(lead.follow_up_attempts(), 1);
        assert_eq!(lead.follow_up_claimed_at(), None);
        assert!(!lead.follow_up_sent());
    }
}
