//! Git operations module
//!
//! This module provides a trait-based interface over libgit2. The session
//! layer only ever talks to [`GitOperations`] and [`EngineFactory`], so tests
//! can swap the real engine for mocks.

pub mod errors;
pub mod operations;
pub mod types;

pub use errors::{ErrorKind, GitError};
pub use operations::{EngineFactory, Git2Factory, Git2Operations, GitOperations};
pub use types::{AuthorIdentity, CommitRecord, CommitSummary, PullOutcome, StatusCounts};
