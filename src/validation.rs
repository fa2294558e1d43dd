//! Field-level validation shared by request handlers and models.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"));

/// One rejected field, as reported in the `errors` array of a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Collects every failing rule instead of stopping at the first.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, message)
    }

    pub fn email(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        self.check(is_valid_email(value.trim()), field, message)
    }

    pub fn slug(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        self.check(value.is_empty() || is_valid_slug(value), field, message)
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str], message: &str) -> &mut Self {
        self.check(allowed.contains(&value), field, message)
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize, message: &str) -> &mut Self {
        self.check(value.chars().count() >= min, field, message)
    }

    pub fn rule(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        self.check(ok, field, message)
    }

    pub fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}
