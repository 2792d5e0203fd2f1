//! Validation capability for configuration sections.
//!
//! A type opts in by implementing [`Validate`]. The provided method reports
//! success, so `impl Validate for Section {}` declares a section with nothing
//! to check.

use std::fmt;
use thiserror::Error;

/// Error returned by a section's own validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl<T: Validate + ?Sized> Validate for &T {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}

/// Failures collected across sibling fields, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(String, ValidationError)>,
}

impl ValidationErrors {
    pub fn push(&mut self, path: impl Into<String>, error: ValidationError) {
        self.errors.push((path.into(), error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.errors.iter().map(|(path, err)| (path.as_str(), err))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{path}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate every field and aggregate the failures.
pub fn validate_fields<'a, I>(fields: I) -> Result<(), ValidationErrors>
where
    I: IntoIterator<Item = (&'a str, &'a dyn Validate)>,
{
    let mut errors = ValidationErrors::default();
    for (path, field) in fields {
        if let Err(err) = field.validate() {
            log::debug!("validation failed for '{path}': {err}");
            errors.push(path, err);
        }
    }
    errors.into_result()
}
