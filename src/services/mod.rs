use thiserror::Error;

use crate::store::StoreError;

pub mod appointments;
pub mod patients;

/// Outcome of a rejected service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input; the message names the field.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Business-rule violation: double booking, illegal cancellation,
    /// duplicate contact details.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Infrastructure(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trimmed, non-blank text or a "`<field>` is required" error.
fn required(value: Option<&str>, field: &str) -> ServiceResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ServiceError::Validation(format!("{field} is required"))),
    }
}

/// Blank optional text is stored as absent.
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn max_len(value: Option<&str>, max: usize, field: &str) -> ServiceResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ServiceError::Validation(format!(
            "{field} must not exceed {max} characters"
        ))),
        _ => Ok(()),
    }
}
