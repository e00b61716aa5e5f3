//! Conversion error types.
//!
//! Every problem the pipeline can report is a [`ConversionError`]: a single
//! tagged value carrying the failing stage, a machine-readable kind, a
//! severity and an optional underlying cause. Hard failures travel through
//! `Result`; soft problems are collected as warnings on the conversion result.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Pipeline stage an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    Parsing,
    Mapping,
    Validation,
    Generation,
}

impl ErrorDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsing => "PARSING",
            Self::Mapping => "MAPPING",
            Self::Validation => "VALIDATION",
            Self::Generation => "GENERATION",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error kind. Each kind belongs to exactly one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // Parsing
    FileNotFound,
    EmptyFile,
    MalformedXml,
    InvalidEncoding,
    SchemaViolation,
    // Mapping
    MissingSourceField,
    InvalidSourceValue,
    CircularMapping,
    UnsupportedMapping,
    // Validation
    MissingRequiredField,
    DuplicateId,
    InvalidReference,
    ConstraintViolation,
    // Generation
    AccessDenied,
    InvalidModel,
    CircularReferences,
}

impl ErrorKind {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            Self::FileNotFound
            | Self::EmptyFile
            | Self::MalformedXml
            | Self::InvalidEncoding
            | Self::SchemaViolation => ErrorDomain::Parsing,
            Self::MissingSourceField
            | Self::InvalidSourceValue
            | Self::CircularMapping
            | Self::UnsupportedMapping => ErrorDomain::Mapping,
            Self::MissingRequiredField
            | Self::DuplicateId
            | Self::InvalidReference
            | Self::ConstraintViolation => ErrorDomain::Validation,
            Self::AccessDenied | Self::InvalidModel | Self::CircularReferences => {
                ErrorDomain::Generation
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "FileNotFound",
            Self::EmptyFile => "EmptyFile",
            Self::MalformedXml => "MalformedXml",
            Self::InvalidEncoding => "InvalidEncoding",
            Self::SchemaViolation => "SchemaViolation",
            Self::MissingSourceField => "MissingSourceField",
            Self::InvalidSourceValue => "InvalidSourceValue",
            Self::CircularMapping => "CircularMapping",
            Self::UnsupportedMapping => "UnsupportedMapping",
            Self::MissingRequiredField => "MissingRequiredField",
            Self::DuplicateId => "DuplicateId",
            Self::InvalidReference => "InvalidReference",
            Self::ConstraintViolation => "ConstraintViolation",
            Self::AccessDenied => "AccessDenied",
            Self::InvalidModel => "InvalidModel",
            Self::CircularReferences => "CircularReferences",
        }
    }
}

/// How serious a reported problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
    Critical,
}

impl Severity {
    /// Errors and criticals fail a conversion; infos and warnings do not.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Tagged conversion error.
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", self.code())]
pub struct ConversionError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    #[source]
    pub cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ConversionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            cause: None,
        }
    }

    /// Soft problem reported alongside a successful result.
    pub fn warning(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message).with_severity(Severity::Warning)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn domain(&self) -> ErrorDomain {
        self.kind.domain()
    }

    /// Stable `<DOMAIN>_<Kind>` code, e.g. `PARSING_MalformedXml`.
    pub fn code(&self) -> String {
        format!("{}_{}", self.kind.domain(), self.kind.as_str())
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl PartialEq for ConversionError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.severity == other.severity && self.message == other.message
    }
}

impl Serialize for ConversionError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ConversionError", 3)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("severity", &self.severity.to_string())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_combine_domain_and_kind() {
        let err = ConversionError::new(ErrorKind::MalformedXml, "bad");
        assert_eq!(err.code(), "PARSING_MalformedXml");
        assert_eq!(err.domain(), ErrorDomain::Parsing);

        let err = ConversionError::new(ErrorKind::DuplicateId, "dup");
        assert_eq!(err.code(), "VALIDATION_DuplicateId");

        let err = ConversionError::new(ErrorKind::CircularReferences, "loop");
        assert_eq!(err.code(), "GENERATION_CircularReferences");
    }

    #[test]
    fn test_warnings_are_not_blocking() {
        let warn = ConversionError::warning(ErrorKind::InvalidReference, "dangling");
        assert_eq!(warn.severity, Severity::Warning);
        assert!(!warn.is_blocking());
        assert!(ConversionError::new(ErrorKind::EmptyFile, "x").is_blocking());
        assert!(
            ConversionError::new(ErrorKind::EmptyFile, "x")
                .with_severity(Severity::Critical)
                .is_blocking()
        );
    }

    #[test]
    fn test_display_includes_code_and_cause_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConversionError::new(ErrorKind::AccessDenied, "cannot write out.yaml")
            .with_cause(io);
        assert_eq!(
            err.to_string(),
            "GENERATION_AccessDenied: cannot write out.yaml"
        );
        let source = std::error::Error::source(&err).expect("cause");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_serializes_code_severity_and_message() {
        let warn = ConversionError::warning(ErrorKind::InvalidReference, "dangling");
        let json = serde_json::to_value(&warn).unwrap();
        assert_eq!(json["code"], "VALIDATION_InvalidReference");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["message"], "dangling");
    }
}
