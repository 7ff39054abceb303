#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use git_gateway::{AuthorIdentity, Git2Factory, RepositorySession};

pub fn factory() -> Arc<Git2Factory> {
    Arc::new(Git2Factory::new(
        "main",
        AuthorIdentity {
            name: "Gateway Tests".to_string(),
            email: "tests@example.com".to_string(),
        },
    ))
}

/// Session over `path`, bound only if a repository already exists there
pub fn session_at(path: &Path) -> RepositorySession {
    RepositorySession::connect(path, factory(), Duration::from_secs(30))
}

/// Freshly initialized session
pub async fn initialized_session(path: &Path) -> RepositorySession {
    let session = session_at(path);
    let envelope = session.initialize().await;
    assert!(envelope.is_success(), "initialize failed: {envelope:?}");
    session
}

pub async fn commit_file(session: &RepositorySession, name: &str, contents: &str) -> String {
    std::fs::write(session.path().join(name), contents).unwrap();
    let staged = session.stage_files(Some(vec![name.to_string()])).await;
    assert!(staged.is_success(), "stage failed: {staged:?}");
    let commit = session.commit(format!("add {name}")).await;
    commit.into_payload().expect("commit failed").sha
}
