#![allow(dead_code)]

pub mod notifier;
pub mod store;
pub mod stub_server;

use lead_followup_core::lead::{Lead, ONE_MINUTE_MS};
use lead_followup_lambda::adapters::lead_store::LeadStore;
use lead_followup_lambda::adapters::memory_store::InMemoryLeadStore;

/// Fixed submission instant used across scenarios.
pub const T0: i64 = 1_760_000_000_000;

pub fn minutes(count: i64) -> i64 {
    count * ONE_MINUTE_MS
}

pub async fn seed_lead(store: &dyn LeadStore, email: &str, name: &str, submitted_at: i64) {
    store
        .put(email, &Lead::new_submission(email, name, submitted_at))
        .await
        .expect("seeding a lead should succeed");
}

pub async fn stored_lead(store: &dyn LeadStore, email: &str) -> Lead {
    store
        .get(email)
        .await
        .expect("reading a lead should succeed")
        .expect("lead should be stored")
        .lead
}

pub fn raw_bytes(store: &InMemoryLeadStore, email: &str) -> Vec<u8> {
    store
        .raw(email)
        .expect("raw read should succeed")
        .expect("lead should be stored")
}
