//! Shared lead follow-up domain primitives.
//!
//! This crate owns the lead record, the follow-up eligibility rules, intake and
//! chat request validation, and the response contracts returned by the
//! handlers. It intentionally excludes AWS SDK, HTTP client, and Lambda
//! runtime concerns; those live in `lead_followup_lambda`.

pub mod chat;
pub mod contract;
pub mod lead;
pub mod retry;
pub mod storage_keys;
pub mod submission;
