use lead_followup_core::chat::{parse_chat_request, reply_or_fallback};
use lead_followup_core::contract::ChatReply;
use serde_json::Value;

use crate::adapters::chat::{ChatCompleter, ChatError};
use crate::handlers::http::{parse_http_event, ApiGatewayResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_origin: String,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

impl CorsPolicy {
    fn apply(&self, response: ApiGatewayResponse) -> ApiGatewayResponse {
        response.with_headers(&[
            ("Access-Control-Allow-Origin", self.allow_origin.as_str()),
            ("Access-Control-Allow-Methods", "POST, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type"),
        ])
    }
}

fn reply_response(status_code: u16, reply: impl Into<String>) -> ApiGatewayResponse {
    ApiGatewayResponse::json(
        status_code,
        &ChatReply {
            reply: reply.into(),
        },
    )
}

/// Chat proxy. `completer` is `None` when the upstream API key is not
/// configured.
pub async fn handle_chat_event(
    event: Value,
    completer: Option<&dyn ChatCompleter>,
    cors: &CorsPolicy,
) -> ApiGatewayResponse {
    cors.apply(respond(event, completer).await)
}

async fn respond(event: Value, completer: Option<&dyn ChatCompleter>) -> ApiGatewayResponse {
    let request = match parse_http_event(&event) {
        Ok(value) => value,
        Err(_) => return reply_response(400, "Invalid JSON body."),
    };

    if request.method == "OPTIONS" {
        return ApiGatewayResponse::empty(204);
    }
    if request.method != "POST" {
        return reply_response(405, "Method not allowed.");
    }

    let turns = match parse_chat_request(&request.body) {
        Ok(value) => value,
        Err(error) => return reply_response(400, error.reply()),
    };

    let Some(completer) = completer else {
        tracing::error!(
            component = "chat_handler",
            event = "chat_misconfigured",
            "chat API key is not configured"
        );
        return reply_response(500, "Service unavailable.");
    };

    match completer.complete(&turns).await {
        Ok(reply) => reply_response(200, reply_or_fallback(reply)),
        Err(ChatError::Status { status, body }) => {
            tracing::error!(
                component = "chat_handler",
                event = "chat_upstream_rejected",
                status,
                body = %body.chars().take(500).collect::<String>(),
            );
            reply_response(502, "Upstream service error.")
        }
        Err(error) => {
            tracing::error!(
                component = "chat_handler",
                event = "chat_upstream_failed",
                error = %error,
            );
            reply_response(502, "Upstream service error.")
        }
    }
}
