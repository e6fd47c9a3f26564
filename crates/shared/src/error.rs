use thiserror::Error;

use crate::domain::FormVariant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown form field '{0}'")]
    UnknownField(String),
    #[error("unknown form variant '{0}' (expected 'basic' or 'extended')")]
    UnknownVariant(String),
    #[error("the {0} form cannot be cleared")]
    ClearUnavailable(FormVariant),
}

#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("report body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("report body must be a JSON object")]
    NotAnObject,
    #[error("report nesting exceeds {0} levels")]
    TooDeep(usize),
}
