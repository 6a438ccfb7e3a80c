use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const DEFAULT_LEADS_PREFIX: &str = "leads";
const LEAD_OBJECT_SUFFIX: &str = ".json";

/// Characters left readable in object keys; everything else is percent-encoded
/// so that `/` and friends in a contact address cannot create new key segments.
const LEAD_ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

pub fn listing_prefix(base_prefix: &str) -> String {
    let trimmed = base_prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

pub fn lead_object_key(base_prefix: &str, lead_id: &str) -> String {
    format!(
        "{}{}{LEAD_OBJECT_SUFFIX}",
        listing_prefix(base_prefix),
        utf8_percent_encode(lead_id, LEAD_ID_ENCODE_SET),
    )
}

pub fn lead_id_from_object_key(base_prefix: &str, key: &str) -> Option<String> {
    let encoded = key
        .strip_prefix(&listing_prefix(base_prefix))?
        .strip_suffix(LEAD_OBJECT_SUFFIX)?;
    if encoded.is_empty() || encoded.contains('/') {
        return None;
    }

    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
