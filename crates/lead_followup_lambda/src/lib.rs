//! AWS-oriented adapters and handlers for the lead follow-up site functions.
//!
//! This crate owns runtime integration details (Lambda handlers, the S3 lead
//! store, the email and chat HTTP clients) on top of the domain rules in
//! `lead_followup_core`.

pub mod adapters;
pub mod handlers;
pub mod logging;
pub mod settings;
