use serde::Deserialize;

use crate::contract::ValidationError;

pub const MAX_EMAIL_CHARS: usize = 320;
pub const MAX_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSubmission {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
}

#[derive(Debug, Default, Deserialize)]
struct RawSubmission {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Picks the body decoder from the declared content type, falling back to
/// sniffing for a JSON object when the header is absent or unrecognised.
pub fn detect_body_format(content_type: Option<&str>, body: &str) -> BodyFormat {
    let declared = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match declared.as_deref() {
        Some("application/json") => BodyFormat::Json,
        Some("application/x-www-form-urlencoded") => BodyFormat::Form,
        _ if body.trim_start().starts_with('{') => BodyFormat::Json,
        _ => BodyFormat::Form,
    }
}

pub fn parse_submission(body: &str, format: BodyFormat) -> Result<LeadSubmission, ValidationError> {
    let raw = match format {
        BodyFormat::Json if body.trim().is_empty() => RawSubmission::default(),
        BodyFormat::Json => serde_json::from_str::<RawSubmission>(body)
            .map_err(|error| {
                ValidationError::new("Malformed JSON body").with_detail(error.to_string())
            })?,
        BodyFormat::Form => {
            let mut raw = RawSubmission::default();
            for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
                match key.as_ref() {
                    "email" if raw.email.is_none() => raw.email = Some(value.into_owned()),
                    "name" if raw.name.is_none() => raw.name = Some(value.into_owned()),
                    _ => {}
                }
            }
            raw
        }
    };

    validate_submission(raw)
}

fn validate_submission(raw: RawSubmission) -> Result<LeadSubmission, ValidationError> {
    let email = raw.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ValidationError::new("Missing email"));
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(ValidationError::new(format!(
            "email exceeds {MAX_EMAIL_CHARS} characters"
        )));
    }

    let name = raw.name.as_deref().map(str::trim).unwrap_or_default();
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(format!(
            "name exceeds {MAX_NAME_CHARS} characters"
        )));
    }

    Ok(LeadSubmission {
        email: email.to_string(),
        name: name.to_string(),
    })
}
