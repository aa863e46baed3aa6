use serde::Serialize;
use std::collections::BTreeMap;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-keyed validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns `value` when no errors were collected.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trims `raw` and records a "required" error when it ends up empty.
pub fn required_text(errors: &mut FieldErrors, field: &str, raw: Option<&str>, max_len: Option<usize>) -> String {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {max} characters."));
        }
    }
    value.to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
