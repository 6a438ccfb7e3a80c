//! Chat proxy request validation and the upstream `generateContent` payload.

use serde_json::{json, Value};

pub const SYSTEM_PROMPT: &str = "\
You are Golden Maple Landscaping's Design & Planning Assistant.

Your role is to help homeowners understand our design-build process, timelines, materials, and what to expect when planning a premium outdoor living project.

Rules:
- Do NOT provide pricing, square-foot rates, or cost estimates
- Do NOT book appointments or collect contact details
- Do NOT discuss discounts or promotions
- If a homeowner appears ready to proceed, direct them to the \"Start Your Project\" button on the website
- Tone must be calm, professional, and confident
- Keep responses concise and informative
- Focus on planning, design decisions, materials, construction process, and long-term durability
";

pub const MAX_CHAT_MESSAGES: usize = 40;
pub const MAX_MESSAGE_CHARS: usize = 4_000;
pub const FALLBACK_REPLY: &str = "Unable to generate a response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" | "model" => Some(Self::Model),
            _ => None,
        }
    }

    fn as_upstream(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRequestError {
    InvalidJson,
    InvalidMessages,
}

impl ChatRequestError {
    pub fn reply(self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON body.",
            Self::InvalidMessages => "Invalid messages format.",
        }
    }
}

pub fn parse_chat_request(body: &str) -> Result<Vec<ChatTurn>, ChatRequestError> {
    let payload: Value = if body.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(body).map_err(|_| ChatRequestError::InvalidJson)?
    };

    let messages = payload
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(ChatRequestError::InvalidMessages)?;
    if messages.is_empty() || messages.len() > MAX_CHAT_MESSAGES {
        return Err(ChatRequestError::InvalidMessages);
    }

    messages.iter().map(parse_turn).collect()
}

fn parse_turn(message: &Value) -> Result<ChatTurn, ChatRequestError> {
    let role = message
        .get("role")
        .and_then(Value::as_str)
        .and_then(ChatRole::parse)
        .ok_or(ChatRequestError::InvalidMessages)?;
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or(ChatRequestError::InvalidMessages)?;
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatRequestError::InvalidMessages);
    }

    Ok(ChatTurn {
        role,
        content: content.to_string(),
    })
}

pub fn generate_content_body(turns: &[ChatTurn]) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|turn| {
            json!({
                "role": turn.role.as_upstream(),
                "parts": [{ "text": turn.content }],
            })
        })
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
        "contents": contents,
    })
}

/// Joins the text parts of the first candidate; `None` when the response has
/// no candidate content at all.
pub fn extract_reply(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(text.trim().to_string())
}

pub fn reply_or_fallback(reply: Option<String>) -> String {
    match reply {
        Some(text) if !text.is_empty() => text,
        _ => FALLBACK_REPLY.to_string(),
    }
}
