use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use lead_followup_lambda::adapters::notifier::{DeliveryOutcome, FollowUpNotifier};

/// Notifier double. Delivers by default; listed addresses fail or never
/// answer.
#[derive(Debug, Default)]
pub struct ScriptedNotifier {
    failing: BTreeSet<String>,
    hanging: BTreeSet<String>,
    attempts: Mutex<Vec<(String, String)>>,
}

impl ScriptedNotifier {
    pub fn delivering() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, email: &str) -> Self {
        self.failing.insert(email.to_string());
        self
    }

    pub fn hanging_for(mut self, email: &str) -> Self {
        self.hanging.insert(email.to_string());
        self
    }

    /// Every `(email, name)` pair the sweep tried to send, in call order.
    pub fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().expect("poisoned mutex").clone()
    }

    pub fn attempted_emails(&self) -> Vec<String> {
        let mut emails: Vec<String> = self.attempts().into_iter().map(|(email, _)| email).collect();
        emails.sort();
        emails
    }
}

#[async_trait]
impl FollowUpNotifier for ScriptedNotifier {
    async fn send_follow_up(&self, email: &str, name: &str) -> DeliveryOutcome {
        self.attempts
            .lock()
            .expect("poisoned mutex")
            .push((email.to_string(), name.to_string()));

        if self.hanging.contains(email) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(email) {
            return DeliveryOutcome::Failed("provider rejected the message".to_string());
        }
        DeliveryOutcome::Delivered
    }
}
