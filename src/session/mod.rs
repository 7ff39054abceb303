//! Repository session
//!
//! A [`RepositorySession`] owns the binding between one configured path and a
//! repository handle. Every operation goes through the same wrapper: the
//! engine call runs on a blocking worker while holding the session mutex, its
//! outcome is logged and counted, and the caller always gets an [`Envelope`]
//! back. Nothing is ever propagated as an error or panic.

pub mod envelope;

pub use envelope::{Envelope, MessageEnvelope};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RepositoryConfig;
use crate::git::{
    AuthorIdentity, CommitRecord, CommitSummary, EngineFactory, ErrorKind, Git2Factory, GitError,
    GitOperations, PullOutcome, StatusCounts,
};
use crate::git::types::short_sha;
use crate::observability::{OperationMetrics, OperationTimer};

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_LOG_COUNT: usize = 10;

type EngineSlot = Arc<Mutex<Option<Box<dyn GitOperations>>>>;

pub struct RepositorySession {
    path: PathBuf,
    factory: Arc<dyn EngineFactory>,
    engine: EngineSlot,
    bound: Arc<AtomicBool>,
    remote_timeout: Duration,
    metrics: Arc<OperationMetrics>,
}

impl RepositorySession {
    /// Create a session for `path`, binding to a repository already there.
    ///
    /// A missing or unreadable repository leaves the session unbound; only
    /// [`RepositorySession::initialize`] can bind it afterwards.
    pub fn connect<P: Into<PathBuf>>(
        path: P,
        factory: Arc<dyn EngineFactory>,
        remote_timeout: Duration,
    ) -> Self {
        let path = path.into();
        let engine = match factory.open(&path) {
            Ok(engine) => {
                info!(path = %path.display(), "Bound to existing repository");
                Some(engine)
            }
            Err(err) if err.kind() == ErrorKind::RefNotFound => {
                info!(path = %path.display(), "Repository not found");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to open repository");
                None
            }
        };

        Self {
            path,
            factory,
            bound: Arc::new(AtomicBool::new(engine.is_some())),
            engine: Arc::new(Mutex::new(engine)),
            remote_timeout,
            metrics: Arc::new(OperationMetrics::new()),
        }
    }

    /// Session backed by libgit2, configured from the `[repository]` section
    pub fn from_config(config: &RepositoryConfig) -> Self {
        let factory = Git2Factory::new(
            config.initial_branch.clone(),
            AuthorIdentity {
                name: config.default_author_name.clone(),
                email: config.default_author_email.clone(),
            },
        );
        Self::connect(
            &config.path,
            Arc::new(factory),
            Duration::from_secs(config.remote_timeout_seconds),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }

    /// Create the repository on disk and bind to it
    pub async fn initialize(&self) -> MessageEnvelope {
        let timer = OperationTimer::new("initialize");
        let engine = Arc::clone(&self.engine);
        let factory = Arc::clone(&self.factory);
        let bound = Arc::clone(&self.bound);
        let path = self.path.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut slot = engine.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(GitError::DuplicateName {
                    message: format!("Repository already initialized at {}", path.display()),
                });
            }
            *slot = Some(factory.init(&path)?);
            bound.store(true, Ordering::SeqCst);
            Ok(())
        });
        let result = Self::joined("initialize", task.await);

        self.respond("initialize", timer, result, |()| {
            info!(path = %self.path.display(), "Initialized repository");
            Envelope::message("Repository initialized")
        })
    }

    /// Stage `paths`, or all changes when `None` or empty
    pub async fn stage_files(&self, paths: Option<Vec<String>>) -> MessageEnvelope {
        let message = match &paths {
            Some(paths) if !paths.is_empty() => format!("Added {} files", paths.len()),
            _ => "Added all files".to_string(),
        };
        let staged = paths.clone();

        let result = self
            .run("stage_files", None, move |engine| engine.stage(paths))
            .await;

        self.respond_timed("stage_files", result, |()| {
            info!(files = ?staged, "Added files to staging area");
            Envelope::message(message)
        })
    }

    pub async fn commit(&self, message: impl Into<String>) -> Envelope<CommitSummary> {
        let message = message.into();
        let result = self
            .run("commit", None, move |engine| engine.commit(&message))
            .await;

        self.respond_timed("commit", result, |sha| {
            info!(sha = %sha, "Created commit");
            Envelope::with_data(
                format!("Committed with SHA: {sha}"),
                CommitSummary {
                    sha: short_sha(&sha),
                },
            )
        })
    }

    pub async fn get_status(&self) -> Envelope<StatusCounts> {
        let result = self.run("get_status", None, |engine| engine.status()).await;
        self.respond_timed("get_status", result, Envelope::data)
    }

    pub async fn get_log(&self, max_count: usize) -> Envelope<Vec<CommitRecord>> {
        let result = self
            .run("get_log", None, move |engine| engine.log(max_count))
            .await;
        self.respond_timed("get_log", result, Envelope::data)
    }

    pub async fn create_branch(&self, name: impl Into<String>) -> MessageEnvelope {
        let name = name.into();
        let branch = name.clone();
        let result = self
            .run("create_branch", None, move |engine| engine.create_branch(&branch))
            .await;

        self.respond_timed("create_branch", result, |()| {
            info!(branch = %name, "Created branch");
            Envelope::message(format!("Created branch: {name}"))
        })
    }

    pub async fn list_branches(&self) -> Envelope<Vec<String>> {
        let result = self
            .run("list_branches", None, |engine| engine.list_branches())
            .await;
        self.respond_timed("list_branches", result, Envelope::data)
    }

    pub async fn add_remote(&self, name: impl Into<String>, url: impl Into<String>) -> MessageEnvelope {
        let name = name.into();
        let url = url.into();
        let (remote, remote_url) = (name.clone(), url.clone());
        let result = self
            .run("add_remote", None, move |engine| engine.add_remote(&remote, &remote_url))
            .await;

        self.respond_timed("add_remote", result, |()| {
            info!(remote = %name, url = %url, "Added remote");
            Envelope::message(format!("Added remote: {name}"))
        })
    }

    pub async fn push(&self, remote: impl Into<String>, branch: impl Into<String>) -> MessageEnvelope {
        let (remote, branch): (String, String) = (remote.into(), branch.into());
        let target = format!("{remote}/{branch}");
        let timeout = self.remote_timeout;

        let result = self
            .run("push", Some(timeout), move |engine| {
                engine.push(&remote, &branch, timeout)
            })
            .await;

        self.respond_timed("push", result, |()| {
            info!(target = %target, "Pushed branch");
            Envelope::message(format!("Pushed to {target}"))
        })
    }

    pub async fn pull(&self, remote: impl Into<String>, branch: impl Into<String>) -> Envelope<PullOutcome> {
        let (remote, branch): (String, String) = (remote.into(), branch.into());
        let target = format!("{remote}/{branch}");
        let timeout = self.remote_timeout;

        let result = self
            .run("pull", Some(timeout), move |engine| {
                engine.pull(&remote, &branch, timeout)
            })
            .await;

        self.respond_timed("pull", result, |outcome| {
            info!(target = %target, outcome = ?outcome, "Pulled branch");
            let message = match &outcome {
                PullOutcome::UpToDate => format!("Already up to date with {target}"),
                _ => format!("Pulled from {target}"),
            };
            Envelope::with_data(message, outcome)
        })
    }

    /// Run `f` against the bound engine on a blocking worker.
    ///
    /// The engine mutex serializes every operation on this session. When a
    /// timeout expires the worker keeps running and releases the mutex once
    /// the engine returns.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        timeout: Option<Duration>,
        f: F,
    ) -> (OperationTimer, Result<T, GitError>)
    where
        T: Send + 'static,
        F: FnOnce(&dyn GitOperations) -> Result<T, GitError> + Send + 'static,
    {
        let timer = OperationTimer::new(operation);

        // Unbound sessions never reach the engine or the filesystem
        if !self.is_bound() {
            return (timer, Err(GitError::UnboundSession));
        }

        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || {
            let slot = engine.lock().unwrap_or_else(PoisonError::into_inner);
            let engine = slot.as_deref().ok_or(GitError::UnboundSession)?;
            f(engine)
        });

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => Self::joined(operation, joined),
                Err(_) => Err(GitError::Timeout {
                    operation: operation.to_string(),
                    seconds: limit.as_secs(),
                }),
            },
            None => Self::joined(operation, task.await),
        };

        (timer, result)
    }

    fn joined<T>(
        operation: &str,
        joined: Result<Result<T, GitError>, tokio::task::JoinError>,
    ) -> Result<T, GitError> {
        joined.unwrap_or_else(|e| Err(GitError::unknown(format!("{operation} failed: {e}"))))
    }

    fn respond_timed<T, U>(
        &self,
        operation: &'static str,
        (timer, result): (OperationTimer, Result<T, GitError>),
        on_success: impl FnOnce(T) -> Envelope<U>,
    ) -> Envelope<U> {
        self.respond(operation, timer, result, on_success)
    }

    fn respond<T, U>(
        &self,
        operation: &'static str,
        timer: OperationTimer,
        result: Result<T, GitError>,
        on_success: impl FnOnce(T) -> Envelope<U>,
    ) -> Envelope<U> {
        match result {
            Ok(value) => {
                self.metrics.record_success();
                timer.finish();
                on_success(value)
            }
            Err(err) => {
                self.metrics.record_failure(&err);
                match err.kind() {
                    ErrorKind::UnboundSession => {
                        warn!(operation, "Rejected operation on unbound session");
                    }
                    kind => {
                        error!(operation, error.kind = kind.as_str(), error = %err, "Repository operation failed");
                    }
                }
                Envelope::from_error(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::operations::{MockEngineFactory, MockGitOperations};
    use mockall::predicate::eq;

    fn unbound_factory() -> MockEngineFactory {
        let mut factory = MockEngineFactory::new();
        factory
            .expect_open()
            .returning(|_| Err(GitError::ref_not_found("could not find repository")));
        factory
    }

    fn bound_session(engine: MockGitOperations, timeout: Duration) -> RepositorySession {
        let mut factory = MockEngineFactory::new();
        factory
            .expect_open()
            .return_once(move |_| Ok(Box::new(engine)));
        RepositorySession::connect("/tmp/repo", Arc::new(factory), timeout)
    }

    #[tokio::test]
    async fn test_unbound_session_rejects_everything() {
        let mut factory = unbound_factory();
        factory.expect_init().never();
        let session = RepositorySession::connect("/tmp/missing", Arc::new(factory), Duration::from_secs(1));

        assert!(!session.is_bound());

        let kinds = vec![
            session.stage_files(None).await.error_kind(),
            session.commit("msg").await.error_kind(),
            session.get_status().await.error_kind(),
            session.get_log(DEFAULT_LOG_COUNT).await.error_kind(),
            session.create_branch("feature").await.error_kind(),
            session.list_branches().await.error_kind(),
            session.add_remote("origin", "https://example.com/r.git").await.error_kind(),
            session.push(DEFAULT_REMOTE, DEFAULT_BRANCH).await.error_kind(),
            session.pull(DEFAULT_REMOTE, DEFAULT_BRANCH).await.error_kind(),
        ];
        assert!(kinds.iter().all(|k| *k == Some(ErrorKind::UnboundSession)));

        let envelope = session.get_status().await;
        assert_eq!(envelope.message_text(), Some("Repository not initialized"));
        assert_eq!(session.metrics().get_stats().unbound_rejections, 10);
    }

    #[tokio::test]
    async fn test_initialize_binds_session() {
        let mut engine = MockGitOperations::new();
        engine.expect_list_branches().returning(|| Ok(vec!["main".to_string()]));

        let mut factory = unbound_factory();
        factory
            .expect_init()
            .times(1)
            .return_once(move |_| Ok(Box::new(engine)));
        let session = RepositorySession::connect("/tmp/new", Arc::new(factory), Duration::from_secs(1));

        let envelope = session.initialize().await;
        assert!(envelope.is_success());
        assert_eq!(envelope.message_text(), Some("Repository initialized"));
        assert!(session.is_bound());

        let branches = session.list_branches().await;
        assert_eq!(branches.payload(), Some(&vec!["main".to_string()]));

        // A second initialize is refused without touching the factory again
        let again = session.initialize().await;
        assert_eq!(again.error_kind(), Some(ErrorKind::DuplicateName));
    }

    #[tokio::test]
    async fn test_initialize_failure_keeps_session_unbound() {
        let mut factory = unbound_factory();
        factory.expect_init().returning(|_| {
            Err(GitError::unknown("permission denied"))
        });
        let session = RepositorySession::connect("/root/locked", Arc::new(factory), Duration::from_secs(1));

        let envelope = session.initialize().await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Unknown));
        assert_eq!(envelope.message_text(), Some("permission denied"));
        assert!(!session.is_bound());
    }

    #[tokio::test]
    async fn test_stage_messages() {
        let mut engine = MockGitOperations::new();
        engine
            .expect_stage()
            .with(eq(Some(vec!["a.txt".to_string(), "b.txt".to_string()])))
            .returning(|_| Ok(()));
        engine.expect_stage().with(eq(None::<Vec<String>>)).returning(|_| Ok(()));
        let session = bound_session(engine, Duration::from_secs(1));

        let some = session
            .stage_files(Some(vec!["a.txt".to_string(), "b.txt".to_string()]))
            .await;
        assert_eq!(some.message_text(), Some("Added 2 files"));

        let all = session.stage_files(None).await;
        assert_eq!(all.message_text(), Some("Added all files"));
    }

    #[tokio::test]
    async fn test_commit_truncates_sha() {
        let mut engine = MockGitOperations::new();
        engine
            .expect_commit()
            .with(eq("msg"))
            .returning(|_| Ok("0123456789abcdef0123456789abcdef01234567".to_string()));
        let session = bound_session(engine, Duration::from_secs(1));

        let envelope = session.commit("msg").await;
        assert_eq!(envelope.payload().unwrap().sha, "01234567");
        assert_eq!(
            envelope.message_text(),
            Some("Committed with SHA: 0123456789abcdef0123456789abcdef01234567")
        );
    }

    #[tokio::test]
    async fn test_engine_errors_become_envelopes() {
        let mut engine = MockGitOperations::new();
        engine.expect_commit().returning(|_| {
            Err(GitError::NothingToCommit {
                message: "nothing to commit".to_string(),
            })
        });
        engine.expect_push().returning(|_, _, _| {
            Err(GitError::ref_not_found("remote 'nowhere' does not exist"))
        });
        let session = bound_session(engine, Duration::from_secs(1));

        let commit = session.commit("msg").await;
        assert_eq!(commit.error_kind(), Some(ErrorKind::NothingToCommit));
        assert!(commit.payload().is_none());

        let push = session.push("nowhere", "main").await;
        assert_eq!(push.error_kind(), Some(ErrorKind::RefNotFound));
        assert_eq!(push.message_text(), Some("remote 'nowhere' does not exist"));
    }

    #[tokio::test]
    async fn test_push_arguments_and_timeout_forwarded() {
        let mut engine = MockGitOperations::new();
        engine
            .expect_push()
            .with(eq("upstream"), eq("develop"), eq(Duration::from_secs(7)))
            .returning(|_, _, _| Ok(()));
        let session = bound_session(engine, Duration::from_secs(7));

        let envelope = session.push("upstream", "develop").await;
        assert_eq!(envelope.message_text(), Some("Pushed to upstream/develop"));
    }

    #[tokio::test]
    async fn test_unbounded_remote_timeout_is_accepted() {
        let mut engine = MockGitOperations::new();
        engine.expect_push().returning(|_, _, _| Ok(()));
        let session = bound_session(engine, Duration::MAX);

        let envelope = session.push(DEFAULT_REMOTE, DEFAULT_BRANCH).await;
        assert!(envelope.is_success());
    }

    #[tokio::test]
    async fn test_slow_pull_times_out() {
        let mut engine = MockGitOperations::new();
        engine.expect_pull().returning(|_, _, _| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(PullOutcome::UpToDate)
        });
        engine.expect_status().returning(|| Ok(StatusCounts::default()));
        let session = bound_session(engine, Duration::from_millis(50));

        let envelope = session.pull(DEFAULT_REMOTE, DEFAULT_BRANCH).await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(session.metrics().get_stats().timeouts, 1);

        // Waits for the abandoned worker to release the engine
        let status = session.get_status().await;
        assert!(status.is_success());
    }

    #[tokio::test]
    async fn test_engine_panic_is_contained() {
        let mut engine = MockGitOperations::new();
        engine
            .expect_create_branch()
            .returning(|_| panic!("engine exploded"));
        engine.expect_list_branches().returning(|| Ok(Vec::new()));
        let session = bound_session(engine, Duration::from_secs(1));

        let envelope = session.create_branch("feature").await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Unknown));

        let branches = session.list_branches().await;
        assert!(branches.is_success());
    }
}
