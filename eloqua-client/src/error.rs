//! Error taxonomy for remote Eloqua operations.
//!
//! Remote business failures (duplicates, validation rejections) surface as
//! errors to the caller. Structural "not found" conditions are not errors;
//! those come back as `None`/`false` from the operation in question.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EloquaError>;

#[derive(Debug, Error)]
pub enum EloquaError {
    /// A remote operation reported failure through an `errors.error` structure.
    #[error("Eloqua Error: Code ({code}) | Message: {message}")]
    Remote { code: String, message: String },

    /// Remote failure whose error code matches the duplicate-value pattern.
    #[error("Eloqua Error: Code ({code}) | Message: {message}")]
    DuplicateRecord { code: String, message: String },

    /// SOAP or HTTP level fault, raised before any result unwrapping runs.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// Credentials missing or invalid when attempting a remote call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no XML template registered under '{0}'")]
    TemplateNotFound(String),

    /// Dynamic attribute access for a name not present in storage or the
    /// reverse attribute map.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// Programmer misuse, e.g. association operations on unpersisted records.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl EloquaError {
    /// Build the error for a remote `errors.error` structure, picking
    /// [`EloquaError::DuplicateRecord`] when the code matches the
    /// duplicate-value pattern.
    pub fn remote_failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        if code.contains("Duplicate") {
            Self::DuplicateRecord { code, message }
        } else {
            Self::Remote { code, message }
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateRecord { .. })
    }
}
