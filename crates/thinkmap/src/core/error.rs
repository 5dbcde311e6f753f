//! Core error types for the editing kernel
//!
//! Mutations never cross manager boundaries as errors; these types surface
//! inside structured results (`ModelOutcome`, `OperationOutcome`) and at the
//! edges of the crate (config loading, spec decoding, transport).

use thiserror::Error;

/// Core error types for the editing kernel
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Operation rejected: {message}")]
    OperationRejected { message: String },

    #[error("HTTP error: status {status}")]
    HttpStatus { status: u16, is_auth: bool },

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        is_network: bool,
        is_auth: bool,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("Malformed event payload on '{topic}': {message}")]
    MalformedEventPayload { topic: String, message: String },

    #[error("Unknown diagram type: {diagram_type}")]
    UnknownDiagramType { diagram_type: String },

    #[error("Invalid {diagram_type} spec: {message}")]
    InvalidSpec {
        diagram_type: String,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EditorError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new operation-rejected error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::OperationRejected {
            message: message.into(),
        }
    }

    /// Create an HTTP status error; 401 and 403 are classified as auth failures
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus {
            status,
            is_auth: matches!(status, 401 | 403),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>, is_network: bool) -> Self {
        Self::Transport {
            message: message.into(),
            is_network,
            is_auth: false,
        }
    }

    /// Create a malformed-response error
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a generation-failed error
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            message: message.into(),
        }
    }

    /// Create an invalid-spec error
    pub fn invalid_spec(diagram_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            diagram_type: diagram_type.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for user/navigation cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the failure looks like an authentication problem
    pub fn is_auth(&self) -> bool {
        match self {
            Self::HttpStatus { is_auth, .. } | Self::Transport { is_auth, .. } => *is_auth,
            _ => false,
        }
    }

    /// True when the failure happened below HTTP (DNS, connect, reset)
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport { is_network: true, .. })
    }
}
