//! Input normalization shared by the services.

use chrono::Utc;
use entity::StringList;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Deserializer};

use crate::error::{ServiceError, ServiceResult};

pub(crate) const MODULE_CODE_MIN: usize = 3;
pub(crate) const MODULE_CODE_MAX: usize = 10;

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Trimmed, lowercased email, or `None` when it is not shaped like one.
pub(crate) fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    valid.then_some(email)
}

/// Blank strings collapse to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required_text(value: Option<String>, message: &str) -> ServiceResult<String> {
    optional_text(value).ok_or_else(|| ServiceError::invalid(message))
}

pub(crate) fn max_chars(field: &str, value: Option<&str>, max: usize) -> ServiceResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ServiceError::invalid(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Trim entries, drop blanks and repeats, keep first-seen order.
pub(crate) fn normalize_list(values: Vec<String>) -> StringList {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    StringList(out)
}

pub(crate) fn normalize_module_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (MODULE_CODE_MIN..=MODULE_CODE_MAX).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(code)
}

pub(crate) fn normalize_module_codes(values: Vec<String>) -> ServiceResult<StringList> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for raw in values {
        if raw.trim().is_empty() {
            continue;
        }
        let code = normalize_module_code(&raw).ok_or_else(|| {
            ServiceError::invalid(format!(
                "Invalid module code '{}': use {MODULE_CODE_MIN}-{MODULE_CODE_MAX} letters or digits",
                raw.trim()
            ))
        })?;
        if !out.contains(&code) {
            out.push(code);
        }
    }
    Ok(StringList(out))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Text(String),
}

/// Accepts `4`, `"4"`, `null`, or an absent field. Blank strings read as absent.
pub(crate) fn flexible_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(value)) => Ok(Some(value)),
        Some(IntOrString::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(IntOrString::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got '{text}'"))),
    }
}
