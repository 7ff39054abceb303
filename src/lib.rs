// Git Gateway Library - HTTP access to a single Git repository
// This exposes the core components for testing and integration

pub mod config;
pub mod git;
pub mod http;
pub mod observability;
pub mod session;
pub mod shutdown;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{GatewayConfig, ObservabilityConfig, RepositoryConfig, ServerConfig};
pub use git::{
    AuthorIdentity, CommitRecord, CommitSummary, EngineFactory, ErrorKind, Git2Factory,
    Git2Operations, GitError, GitOperations, PullOutcome, StatusCounts,
};
pub use http::{create_router, AppState};
pub use observability::{OperationMetrics, OperationStats, OperationTimer};
pub use session::{Envelope, MessageEnvelope, RepositorySession};
pub use shutdown::shutdown_signal;
pub use telemetry::{create_request_span, generate_correlation_id, init_telemetry};
