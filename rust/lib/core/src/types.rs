use chrono::SecondsFormat;

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
///
/// Always UTC with exactly six fractional digits, so string order is
/// chronological order. Keyset pagination compares these as TEXT.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// True if the string is empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
