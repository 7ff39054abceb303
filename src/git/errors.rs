//! Error taxonomy for repository operations
//!
//! Every failure coming out of libgit2 is translated here into a closed set
//! of kinds. The engine's message is kept verbatim so callers still see what
//! libgit2 reported.

use git2::{ErrorClass, ErrorCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not initialized")]
    UnboundSession,
    #[error("{message}")]
    RefNotFound { message: String },
    #[error("{message}")]
    DuplicateName { message: String },
    #[error("{message}")]
    InvalidArgument { message: String },
    #[error("{message}")]
    NothingToCommit { message: String },
    #[error("{message}")]
    Conflict { message: String, paths: Vec<String> },
    #[error("{message}")]
    TransportFailure { message: String },
    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
    #[error("{message}")]
    Corruption { message: String },
    #[error("{message}")]
    Unknown { message: String },
}

/// Wire-level discriminant of a [`GitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnboundSession,
    RefNotFound,
    DuplicateName,
    InvalidArgument,
    NothingToCommit,
    Conflict,
    TransportFailure,
    Timeout,
    Corruption,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnboundSession => "unbound_session",
            ErrorKind::RefNotFound => "ref_not_found",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NothingToCommit => "nothing_to_commit",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Corruption => "corruption",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::UnboundSession => ErrorKind::UnboundSession,
            GitError::RefNotFound { .. } => ErrorKind::RefNotFound,
            GitError::DuplicateName { .. } => ErrorKind::DuplicateName,
            GitError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            GitError::NothingToCommit { .. } => ErrorKind::NothingToCommit,
            GitError::Conflict { .. } => ErrorKind::Conflict,
            GitError::TransportFailure { .. } => ErrorKind::TransportFailure,
            GitError::Timeout { .. } => ErrorKind::Timeout,
            GitError::Corruption { .. } => ErrorKind::Corruption,
            GitError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn ref_not_found(message: impl Into<String>) -> Self {
        GitError::RefNotFound {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        GitError::TransportFailure {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        GitError::Unknown {
            message: message.into(),
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        let message = err.message().to_string();

        match err.code() {
            ErrorCode::NotFound | ErrorCode::UnbornBranch => {
                return GitError::RefNotFound { message };
            }
            ErrorCode::Exists => return GitError::DuplicateName { message },
            ErrorCode::InvalidSpec | ErrorCode::Invalid | ErrorCode::Ambiguous => {
                return GitError::InvalidArgument { message };
            }
            ErrorCode::Conflict | ErrorCode::MergeConflict | ErrorCode::Unmerged => {
                return GitError::Conflict {
                    message,
                    paths: Vec::new(),
                };
            }
            ErrorCode::Auth | ErrorCode::Certificate | ErrorCode::NotFastForward => {
                return GitError::TransportFailure { message };
            }
            ErrorCode::HashsumMismatch => return GitError::Corruption { message },
            _ => {}
        }

        match err.class() {
            ErrorClass::Net | ErrorClass::Ssl | ErrorClass::Ssh | ErrorClass::Http => {
                GitError::TransportFailure { message }
            }
            ErrorClass::Odb | ErrorClass::Zlib | ErrorClass::Object | ErrorClass::Sha1 => {
                GitError::Corruption { message }
            }
            _ => GitError::Unknown { message },
        }
    }
}
