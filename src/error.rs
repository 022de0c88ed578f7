// Error types module

use std::fmt;

use crate::cipher::TokenError;
use crate::pipeline::PipelineError;
use crate::resolver::ResolveError;
use crate::spec::SpecError;

/// Centralized error type for the image service
///
/// Categorizes failures for debugging, monitoring, and HTTP status mapping.
/// Per the token design, anything a client could learn from (missing
/// resources, tampered or stale tokens) collapses into "not found".
#[derive(Debug)]
pub enum ServiceError {
    /// Resource resolution failures (missing file, unreadable file)
    Resource(ResolveError),
    /// Token rejection (malformed text or a keystream that no longer matches)
    Token(String),
    /// Spec failures (failed checksum, unrepresentable ratio)
    Spec(SpecError),
    /// Pipeline failures (undecodable source, resize or encode errors)
    Pipeline(PipelineError),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Resource(err) => write!(f, "Resource error: {}", err),
            ServiceError::Token(msg) => write!(f, "Token error: {}", msg),
            ServiceError::Spec(err) => write!(f, "Spec error: {}", err),
            ServiceError::Pipeline(err) => write!(f, "Pipeline error: {}", err),
            ServiceError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Resource(err) => Some(err),
            ServiceError::Spec(err) => Some(err),
            ServiceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Maps service errors to HTTP status codes
    ///
    /// Status mapping:
    /// - Resource not found, bad/stale token, failed checksum → 404 (Not Found)
    /// - Unrepresentable ratio in a requested spec → 400 (Bad Request)
    /// - Resource I/O, pipeline, configuration → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServiceError::Resource(ResolveError::NotFound { .. }) => 404,
            ServiceError::Resource(ResolveError::Io(_)) => 500,
            ServiceError::Token(_) => 404,
            ServiceError::Spec(SpecError::Checksum) => 404,
            ServiceError::Spec(SpecError::Precision { .. }) => 400,
            ServiceError::Pipeline(_) => 500,
            ServiceError::Config(_) => 500,
        }
    }
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        ServiceError::Resource(err)
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        ServiceError::Token(err.to_string())
    }
}

impl From<SpecError> for ServiceError {
    fn from(err: SpecError) -> Self {
        ServiceError::Spec(err)
    }
}

impl From<PipelineError> for ServiceError {
    fn from(err: PipelineError) -> Self {
        ServiceError::Pipeline(err)
    }
}
