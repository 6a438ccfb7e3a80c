use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";
pub const DEFAULT_FOLLOW_UP_FROM: &str =
    "Golden Maple Landscaping <no-reply@goldenmaplelandscaping.ca>";
pub const FOLLOW_UP_SUBJECT: &str = "Quick follow-up on your request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Sends the one-time follow-up message. Implementations report every
/// transport problem as `DeliveryOutcome::Failed` instead of erroring.
#[async_trait]
pub trait FollowUpNotifier: Send + Sync {
    async fn send_follow_up(&self, email: &str, name: &str) -> DeliveryOutcome;
}

pub fn render_follow_up_html(name: &str) -> String {
    let greeting = if name.trim().is_empty() {
        "Hi,".to_string()
    } else {
        format!("Hi {},", escape_html(name.trim()))
    };

    format!(
        "<p>{greeting}</p>\n\
         <p>I just wanted to follow up and make sure your message didn’t get lost.</p>\n\
         <p>If it helps, the next step is usually a quick clarification around scope and timing.</p>\n\
         <p>Feel free to reply here and we can take a look together.</p>\n\
         <p>— Yorkis</p>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[derive(Debug, Deserialize)]
struct ResendAcknowledgement {
    id: String,
}

#[derive(Debug, Clone)]
pub struct ResendNotifier {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(
        http_client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    fn emails_endpoint(&self) -> String {
        format!("{}/emails", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl FollowUpNotifier for ResendNotifier {
    async fn send_follow_up(&self, email: &str, name: &str) -> DeliveryOutcome {
        let payload = json!({
            "from": self.from,
            "to": [email],
            "subject": FOLLOW_UP_SUBJECT,
            "html": render_follow_up_html(name),
        });

        let response = match self
            .http_client
            .post(self.emails_endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return DeliveryOutcome::Failed(format!("email request failed: {error}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return DeliveryOutcome::Failed(format!(
                "email provider returned {status}: {}",
                body.chars().take(200).collect::<String>()
            ));
        }

        match response.json::<ResendAcknowledgement>().await {
            Ok(ack) if !ack.id.trim().is_empty() => DeliveryOutcome::Delivered,
            Ok(_) => DeliveryOutcome::Failed("email acknowledgement had an empty id".to_string()),
            Err(error) => {
                DeliveryOutcome::Failed(format!("malformed email acknowledgement: {error}"))
            }
        }
    }
}
