use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl ApiGatewayResponse {
    pub fn json(status_code: u16, payload: &impl Serialize) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        Self {
            status_code,
            headers: json!({"Content-Type": "application/json"}),
            body,
        }
    }

    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            headers: json!({}),
            body: String::new(),
        }
    }

    pub fn with_headers(mut self, extra: &[(&str, &str)]) -> Self {
        if !self.headers.is_object() {
            self.headers = Value::Object(Map::new());
        }
        if let Some(headers) = self.headers.as_object_mut() {
            for (name, value) in extra {
                headers.insert((*name).to_string(), Value::from(*value));
            }
        }
        self
    }
}

pub fn error_response(status_code: u16, error: &str, message: &str) -> ApiGatewayResponse {
    ApiGatewayResponse::json(
        status_code,
        &json!({
            "error": error,
            "message": message,
        }),
    )
}

pub fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(400, "validation_error", message)
}

/// The parts of an API Gateway / function URL event the handlers look at.
/// Header names are lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Normalizes a proxy event. A direct invocation without `httpMethod`,
/// `requestContext`, or `body` is treated as a POST whose body is the event.
pub fn parse_http_event(event: &Value) -> Result<HttpRequest, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let method = object
        .get("httpMethod")
        .and_then(Value::as_str)
        .or_else(|| {
            event
                .pointer("/requestContext/http/method")
                .and_then(Value::as_str)
        })
        .unwrap_or("POST")
        .to_ascii_uppercase();

    let headers = string_map(object.get("headers"))
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();
    let mut query = string_map(object.get("queryStringParameters"));
    if query.is_empty() {
        if let Some(raw_query) = object.get("rawQueryString").and_then(Value::as_str) {
            query = url_query(raw_query);
        }
    }

    let is_proxy_event = object.contains_key("httpMethod")
        || object.contains_key("requestContext")
        || object.contains_key("body");
    let body = if is_proxy_event {
        decode_body(object.get("body"), object.get("isBase64Encoded"))?
    } else {
        event.to_string()
    };

    Ok(HttpRequest {
        method,
        headers,
        query,
        body,
    })
}

fn decode_body(body: Option<&Value>, is_base64: Option<&Value>) -> Result<String, String> {
    let text = match body {
        None | Some(Value::Null) => return Ok(String::new()),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(_)) => return Ok(body.map(Value::to_string).unwrap_or_default()),
        Some(_) => return Err("Request body must be a string or JSON object".to_string()),
    };

    if is_base64.and_then(Value::as_bool).unwrap_or(false) {
        let bytes = BASE64
            .decode(text.as_bytes())
            .map_err(|_| "Malformed base64 body".to_string())?;
        String::from_utf8(bytes).map_err(|_| "Request body is not UTF-8".to_string())
    } else {
        Ok(text)
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn url_query(raw_query: &str) -> BTreeMap<String, String> {
    let mut query = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        query
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    query
}
