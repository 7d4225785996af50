//! Request body extraction and field validation.
//!
//! Handlers take bodies through [`ApiJson`] so malformed JSON is answered
//! with the same `VALIDATION_ERROR` shape as field-level checks collected by
//! [`Validator`].

use axum::extract::FromRequest;

use crate::error::{AppError, FieldError, Result};

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Collects field errors and fails with all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "is required")
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let ok = value.chars().count() <= max;
        if !ok {
            self.errors.push(FieldError::new(
                field,
                format!("must be at most {} characters", max),
            ));
        }
        self
    }

    /// Required and no longer than `max`.
    pub fn text(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        self.required(field, value).max_len(field, value, max)
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        match value {
            Some(v) => self.max_len(field, v, max),
            None => self,
        }
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let ok = value.chars().count() >= min;
        if !ok {
            self.errors.push(FieldError::new(
                field,
                format!("must be at least {} characters", min),
            ));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_plausible_email(value), field, "must be a valid email address")
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value > 0, field, "must be greater than zero")
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value >= 0, field, "must not be negative")
    }

    /// `Ok` when nothing was recorded, otherwise every recorded error.
    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidInput(std::mem::take(&mut self.errors)))
        }
    }
}

fn is_plausible_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}
