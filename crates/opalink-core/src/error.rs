//! Shared error type across opalink crates.

use thiserror::Error;

use crate::registry::Handle;

/// Stable error codes (exposed to tests and foreign callers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Source tree could not be read or assembled.
    LoadError,
    /// Policy or query failed to compile.
    CompileError,
    /// Handle absent or already disposed.
    NotFound,
    /// Evaluation input is not valid JSON.
    ParseFailure,
    /// Runtime failure while running the query.
    EvaluationFailure,
    /// Build manifest failed validation.
    InvalidConfig,
    /// Unsupported manifest or artifact version.
    UnsupportedVersion,
}

impl ErrorCode {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::LoadError => "LOAD_ERROR",
            ErrorCode::CompileError => "COMPILE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ParseFailure => "PARSE_FAILURE",
            ErrorCode::EvaluationFailure => "EVALUATION_FAILURE",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, OpaLinkError>;

/// Unified error type used by core and the C boundary.
///
/// Engine diagnostics are carried verbatim: `Display` prints the message
/// exactly as the policy engine, JSON parser, or filesystem reported it.
#[derive(Debug, Error)]
pub enum OpaLinkError {
    #[error("{0}")]
    Load(String),
    #[error("{0}")]
    Compile(String),
    #[error("could not find rego query")]
    NotFound(Handle),
    #[error("{0}")]
    ParseFailure(String),
    #[error("{0}")]
    Evaluation(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),
}

impl OpaLinkError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            OpaLinkError::Load(_) => ErrorCode::LoadError,
            OpaLinkError::Compile(_) => ErrorCode::CompileError,
            OpaLinkError::NotFound(_) => ErrorCode::NotFound,
            OpaLinkError::ParseFailure(_) => ErrorCode::ParseFailure,
            OpaLinkError::Evaluation(_) => ErrorCode::EvaluationFailure,
            OpaLinkError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            OpaLinkError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
        }
    }
}
