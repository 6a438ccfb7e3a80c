//! Environment configuration for the Lambda binaries.
//!
//! Every setting is read through a lookup function so tests can supply a
//! plain map instead of mutating the process environment. Empty values count
//! as unset.

use std::str::FromStr;
use std::time::Duration;

use lead_followup_core::lead::{FollowUpRules, ONE_MINUTE_MS};
use lead_followup_core::retry::RetryPolicy;
use lead_followup_core::storage_keys::DEFAULT_LEADS_PREFIX;

use crate::adapters::chat::{DEFAULT_GEMINI_API_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TIMEOUT};
use crate::adapters::notifier::{DEFAULT_FOLLOW_UP_FROM, DEFAULT_RESEND_API_URL};
use crate::handlers::chat::CorsPolicy;
use crate::handlers::sweep::{SweepConfig, DEFAULT_MAX_CONCURRENCY};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}; expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub bucket: String,
    pub prefix: String,
}

impl StoreSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let bucket = read(&lookup, "LEADS_BUCKET").ok_or(SettingsError::Missing("LEADS_BUCKET"))?;
        let prefix =
            read(&lookup, "LEADS_PREFIX").unwrap_or_else(|| DEFAULT_LEADS_PREFIX.to_string());
        Ok(Self { bucket, prefix })
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(env_lookup)
    }
}

/// Email provider settings. A missing API key is not an error here; the sweep
/// reports it per tick instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub from: String,
}

impl NotifierSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: read(&lookup, "RESEND_API_KEY"),
            api_url: read(&lookup, "RESEND_API_URL")
                .unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            from: read(&lookup, "FOLLOW_UP_FROM")
                .unwrap_or_else(|| DEFAULT_FOLLOW_UP_FROM.to_string()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSettings {
    pub delay_minutes: i64,
    pub send_timeout: Duration,
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub conditional_writes: bool,
    pub claim_lease: Duration,
}

impl SweepSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let delay_minutes: i64 = parse_or(&lookup, "FOLLOW_UP_DELAY_MINUTES", 20, "minutes")?;
        if delay_minutes < 0 {
            return Err(invalid(
                "FOLLOW_UP_DELAY_MINUTES",
                delay_minutes.to_string(),
                "minutes",
            ));
        }

        let send_timeout_secs: u64 =
            parse_or(&lookup, "FOLLOW_UP_SEND_TIMEOUT_SECS", 10, "seconds")?;
        let max_concurrency: usize = parse_or(
            &lookup,
            "FOLLOW_UP_MAX_CONCURRENCY",
            DEFAULT_MAX_CONCURRENCY,
            "a positive integer",
        )?;
        if max_concurrency == 0 {
            return Err(invalid(
                "FOLLOW_UP_MAX_CONCURRENCY",
                "0".to_string(),
                "a positive integer",
            ));
        }

        let max_attempts = parse_optional::<u32>(&lookup, "FOLLOW_UP_MAX_ATTEMPTS", "a count")?;
        let backoff_base_secs: u64 =
            parse_or(&lookup, "FOLLOW_UP_BACKOFF_BASE_SECS", 0, "seconds")?;
        let backoff_max_secs: u64 = parse_or(&lookup, "FOLLOW_UP_BACKOFF_MAX_SECS", 0, "seconds")?;
        let conditional_writes = parse_flag(&lookup, "FOLLOW_UP_CONDITIONAL_WRITES")?;
        let claim_lease_secs: u64 =
            parse_or(&lookup, "FOLLOW_UP_CLAIM_LEASE_SECS", 300, "seconds")?;

        Ok(Self {
            delay_minutes,
            send_timeout: Duration::from_secs(send_timeout_secs),
            max_concurrency,
            retry: RetryPolicy {
                max_attempts,
                backoff_base_ms: backoff_base_secs.saturating_mul(1000),
                backoff_max_ms: backoff_max_secs.saturating_mul(1000),
            },
            conditional_writes,
            claim_lease: Duration::from_secs(claim_lease_secs),
        })
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(env_lookup)
    }

    pub fn sweep_config(&self, now_ms: i64) -> SweepConfig {
        SweepConfig {
            now_ms,
            rules: FollowUpRules {
                delay_ms: self.delay_minutes.saturating_mul(ONE_MINUTE_MS),
                retry: self.retry,
            },
            send_timeout: self.send_timeout,
            max_concurrency: self.max_concurrency,
            conditional_writes: self.conditional_writes,
            claim_lease_ms: i64::try_from(self.claim_lease.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
    pub cors: CorsPolicy,
}

impl ChatSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let cors = read(&lookup, "CORS_ALLOW_ORIGIN")
            .map(|allow_origin| CorsPolicy { allow_origin })
            .unwrap_or_default();
        let timeout_secs: u64 = parse_or(
            &lookup,
            "GEMINI_TIMEOUT_SECS",
            DEFAULT_GEMINI_TIMEOUT.as_secs(),
            "a whole number of seconds",
        )?;
        if timeout_secs == 0 {
            return Err(invalid(
                "GEMINI_TIMEOUT_SECS",
                timeout_secs.to_string(),
                "at least 1 second",
            ));
        }
        Ok(Self {
            api_key: read(&lookup, "GEMINI_API_KEY"),
            api_url: read(&lookup, "GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            model: read(&lookup, "GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            cors,
        })
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(env_lookup)
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn read(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn invalid(name: &'static str, value: String, expected: &'static str) -> SettingsError {
    SettingsError::Invalid {
        name,
        value,
        expected,
    }
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, SettingsError> {
    read(lookup, name)
        .map(|raw| raw.parse::<T>().map_err(|_| invalid(name, raw, expected)))
        .transpose()
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, SettingsError> {
    Ok(parse_optional(lookup, name, expected)?.unwrap_or(default))
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, SettingsError> {
    let Some(raw) = read(lookup, name) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, raw, "true or false")),
    }
}
