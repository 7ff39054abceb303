use serde::Serialize;

use crate::git::{ErrorKind, GitError};

/// Uniform result of every session operation.
///
/// Serializes as `{"status": "success", "message": ..., "data": ...}` or
/// `{"status": "error", "kind": ..., "message": ...}`. Error envelopes never
/// carry data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope<T> {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<T>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Envelope of an operation that only reports a message
pub type MessageEnvelope = Envelope<()>;

impl<T> Envelope<T> {
    pub fn message(message: impl Into<String>) -> Self {
        Envelope::Success {
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn data(data: T) -> Self {
        Envelope::Success {
            message: None,
            data: Some(data),
        }
    }

    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Envelope::Success {
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn from_error(error: &GitError) -> Self {
        Envelope::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Envelope::Error { kind, .. } => Some(*kind),
            Envelope::Success { .. } => None,
        }
    }

    pub fn message_text(&self) -> Option<&str> {
        match self {
            Envelope::Success { message, .. } => message.as_deref(),
            Envelope::Error { message, .. } => Some(message),
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Envelope::Success { data, .. } => data.as_ref(),
            Envelope::Error { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Envelope::Success { data, .. } => data,
            Envelope::Error { .. } => None,
        }
    }
}
