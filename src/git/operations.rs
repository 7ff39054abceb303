use git2::build::CheckoutBuilder;
use git2::{
    AnnotatedCommit, BranchType, Commit, Cred, CredentialType, ErrorClass, ErrorCode,
    FetchOptions, Index, IndexAddOption, PushOptions, RemoteCallbacks, Repository,
    RepositoryInitOptions, Signature, Sort, Status, StatusOptions,
};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;

use super::errors::GitError;
use super::types::{short_sha, AuthorIdentity, CommitRecord, PullOutcome, StatusCounts};

/// Operations a bound repository session can perform.
///
/// Implementations are driven from blocking worker threads, one call at a
/// time, so they only need to be `Send`.
#[cfg_attr(test, automock)]
pub trait GitOperations: Send {
    /// Stage the given paths, or every change when `paths` is `None`
    fn stage(&self, paths: Option<Vec<String>>) -> Result<(), GitError>;

    /// Commit the index on top of HEAD and return the full hash
    fn commit(&self, message: &str) -> Result<String, GitError>;

    /// Count modified, staged and untracked files
    fn status(&self) -> Result<StatusCounts, GitError>;

    /// Most recent commits reachable from HEAD, newest first
    fn log(&self, max_count: usize) -> Result<Vec<CommitRecord>, GitError>;

    /// Create a branch at HEAD without checking it out
    fn create_branch(&self, name: &str) -> Result<(), GitError>;

    /// Local branch names
    fn list_branches(&self) -> Result<Vec<String>, GitError>;

    /// Register a remote
    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError>;

    /// Push a local branch to the same name on a remote
    fn push(&self, remote: &str, branch: &str, timeout: Duration) -> Result<(), GitError>;

    /// Fetch a remote branch and integrate it into the checked-out branch
    fn pull(&self, remote: &str, branch: &str, timeout: Duration) -> Result<PullOutcome, GitError>;
}

/// Opens or creates repositories, handing back a boxed engine.
#[cfg_attr(test, automock)]
pub trait EngineFactory: Send + Sync {
    /// Open an existing repository at exactly `path`
    fn open(&self, path: &Path) -> Result<Box<dyn GitOperations>, GitError>;

    /// Create a new repository at `path`; fails if one already exists
    fn init(&self, path: &Path) -> Result<Box<dyn GitOperations>, GitError>;
}

/// Factory producing libgit2-backed engines
#[derive(Debug, Clone)]
pub struct Git2Factory {
    initial_branch: String,
    fallback_author: AuthorIdentity,
}

impl Git2Factory {
    pub fn new(initial_branch: impl Into<String>, fallback_author: AuthorIdentity) -> Self {
        Self {
            initial_branch: initial_branch.into(),
            fallback_author,
        }
    }
}

impl EngineFactory for Git2Factory {
    fn open(&self, path: &Path) -> Result<Box<dyn GitOperations>, GitError> {
        let ops = Git2Operations::open(path, self.fallback_author.clone())?;
        Ok(Box::new(ops))
    }

    fn init(&self, path: &Path) -> Result<Box<dyn GitOperations>, GitError> {
        let ops = Git2Operations::init(path, &self.initial_branch, self.fallback_author.clone())?;
        Ok(Box::new(ops))
    }
}

/// Implementation of GitOperations using git2
pub struct Git2Operations {
    repo: Repository,
    fallback_author: AuthorIdentity,
}

impl Git2Operations {
    pub fn open<P: AsRef<Path>>(path: P, fallback_author: AuthorIdentity) -> Result<Self, GitError> {
        let repo = Repository::open(path)?;
        Ok(Self {
            repo,
            fallback_author,
        })
    }

    pub fn init<P: AsRef<Path>>(
        path: P,
        initial_branch: &str,
        fallback_author: AuthorIdentity,
    ) -> Result<Self, GitError> {
        let mut opts = RepositoryInitOptions::new();
        opts.no_reinit(true)
            .mkdir(true)
            .mkpath(true)
            .initial_head(initial_branch);

        let repo = Repository::init_opts(path, &opts)?;
        Ok(Self {
            repo,
            fallback_author,
        })
    }

    fn signature(&self) -> Result<Signature<'static>, GitError> {
        // Prefer user.name/user.email from config, fall back to the configured identity
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now(
                &self.fallback_author.name,
                &self.fallback_author.email,
            )?),
        }
    }

    /// HEAD's commit, or `None` on an unborn branch
    fn head_commit(&self) -> Result<Option<Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn workdir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::InvalidArgument {
            message: "this operation must be run in a work tree".to_string(),
        })
    }

    fn remote_callbacks<'cb>(&self, deadline: Option<Instant>) -> Result<RemoteCallbacks<'cb>, GitError> {
        let config = self.repo.config()?;
        let mut attempts = 0u8;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed| {
            // libgit2 keeps asking while credentials are rejected
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    format!("authentication failed for '{url}'"),
                ));
            }

            if allowed.contains(CredentialType::SSH_KEY) {
                Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
            } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                Cred::credential_helper(&config, url, username_from_url)
            } else {
                Cred::default()
            }
        });
        callbacks.transfer_progress(move |_| !expired(deadline));
        callbacks.sideband_progress(move |_| !expired(deadline));

        Ok(callbacks)
    }

    /// Checkout `target` and point the local branch at it
    fn fast_forward(&self, local_ref: &str, target: git2::Oid) -> Result<(), GitError> {
        let object = self.repo.find_object(target, None)?;
        self.repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))?;

        match self.repo.find_reference(local_ref) {
            Ok(mut reference) => {
                reference.set_target(target, "pull: fast-forward")?;
            }
            Err(_) => {
                self.repo.reference(local_ref, target, false, "pull: initial")?;
            }
        }
        self.repo.set_head(local_ref)?;
        Ok(())
    }

    fn integrate(
        &self,
        remote: &str,
        branch: &str,
        incoming: &AnnotatedCommit<'_>,
    ) -> Result<PullOutcome, GitError> {
        let local_ref = format!("refs/heads/{branch}");
        let head = self.repo.find_reference("HEAD")?;
        if head.symbolic_target() != Some(local_ref.as_str()) {
            return Err(GitError::InvalidArgument {
                message: format!("branch '{branch}' is not checked out"),
            });
        }

        let (analysis, _) = self.repo.merge_analysis(&[incoming])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        if analysis.is_unborn() || analysis.is_fast_forward() {
            self.fast_forward(&local_ref, incoming.id())?;
            return Ok(PullOutcome::FastForward {
                sha: short_sha(&incoming.id().to_string()),
            });
        }

        // Diverged: merge in memory so a conflict leaves the work tree untouched
        let ours = self
            .head_commit()?
            .ok_or_else(|| GitError::ref_not_found(format!("branch '{branch}' has no commits")))?;
        let theirs = self.repo.find_commit(incoming.id())?;
        let mut merged = self.repo.merge_commits(&ours, &theirs, None)?;

        if merged.has_conflicts() {
            let paths = conflict_paths(&merged)?;
            return Err(GitError::Conflict {
                message: format!(
                    "Automatic merge failed; conflicts in: {}",
                    paths.join(", ")
                ),
                paths,
            });
        }

        let tree_id = merged.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let message = format!("Merge branch '{branch}' of {remote}");
        let oid = self.repo.commit(
            None,
            &signature,
            &signature,
            &message,
            &tree,
            &[&ours, &theirs],
        )?;

        self.repo
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))?;
        self.repo
            .find_reference(&local_ref)?
            .set_target(oid, "pull: merge")?;

        Ok(PullOutcome::Merged {
            sha: short_sha(&oid.to_string()),
        })
    }
}

/// Resolve a caller-supplied path to one relative to the work tree
fn repo_relative(workdir: &Path, path: &str) -> Result<PathBuf, GitError> {
    let outside = || GitError::InvalidArgument {
        message: format!("'{path}' is outside repository at '{}'", workdir.display()),
    };

    let candidate = Path::new(path);
    let relative = if candidate.is_absolute() {
        match candidate.strip_prefix(workdir) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => {
                // The work tree path is canonical; the caller's may go through a symlink
                let canonical = canonicalize_lenient(candidate).ok_or_else(outside)?;
                canonical
                    .strip_prefix(workdir)
                    .map_err(|_| outside())?
                    .to_path_buf()
            }
        }
    } else {
        candidate.to_path_buf()
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    Ok(normalized)
}

/// Canonicalize the deepest existing ancestor and re-append the rest
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = current.canonicalize() {
            return Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        missing.push(current.file_name()?.to_os_string());
        current = current.parent()?;
    }
}

/// Whether the index holds entries below `dir`
fn tracks_directory(index: &Index, dir: &Path) -> bool {
    let prefix = format!("{}/", dir.to_string_lossy());
    index
        .iter()
        .any(|entry| entry.path.starts_with(prefix.as_bytes()))
}

fn conflict_paths(index: &Index) -> Result<Vec<String>, GitError> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths)
}

/// `None` when `timeout` reaches past what `Instant` can represent
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Aborted transfer callbacks surface as `ErrorCode::User`; report those as timeouts
fn network_error(
    err: git2::Error,
    operation: &str,
    timeout: Duration,
    deadline: Option<Instant>,
) -> GitError {
    if err.code() == ErrorCode::User && expired(deadline) {
        GitError::Timeout {
            operation: operation.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        err.into()
    }
}

impl GitOperations for Git2Operations {
    fn stage(&self, paths: Option<Vec<String>>) -> Result<(), GitError> {
        let mut index = self.repo.index()?;

        match paths {
            Some(paths) if !paths.is_empty() => {
                let workdir = self.workdir()?;
                for path in &paths {
                    let relative = repo_relative(workdir, path)?;
                    let on_disk = workdir.join(&relative);

                    if relative.as_os_str().is_empty() {
                        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
                        index.update_all(["*"], None)?;
                    } else if on_disk.is_dir() || tracks_directory(&index, &relative) {
                        // Directories go through pathspecs, which also pick up deletions
                        index.add_all([relative.as_path()], IndexAddOption::DEFAULT, None)?;
                        index.update_all([relative.as_path()], None)?;
                    } else if on_disk.exists() {
                        index.add_path(&relative)?;
                    } else if index.get_path(&relative, 0).is_some() {
                        // Deleted from the work tree: stage the removal
                        index.remove_path(&relative)?;
                    } else {
                        return Err(GitError::ref_not_found(format!(
                            "pathspec '{path}' did not match any files"
                        )));
                    }
                }
            }
            _ => {
                self.workdir()?;
                index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
                index.update_all(["*"], None)?;
            }
        }

        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let parent = self.head_commit()?;

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(GitError::NothingToCommit {
                message: "nothing to commit (no changes added to the index)".to_string(),
            });
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        Ok(oid.to_string())
    }

    fn status(&self) -> Result<StatusCounts, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut counts = StatusCounts::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.intersects(
                Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_TYPECHANGE | Status::WT_RENAMED,
            ) {
                counts.modified += 1;
            }
            if status.intersects(
                Status::INDEX_NEW
                    | Status::INDEX_MODIFIED
                    | Status::INDEX_DELETED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            ) {
                counts.staged += 1;
            }
            if status.contains(Status::WT_NEW) {
                counts.untracked += 1;
            }
        }

        Ok(counts)
    }

    fn log(&self, max_count: usize) -> Result<Vec<CommitRecord>, GitError> {
        if self.head_commit()?.is_none() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut records = Vec::new();
        for oid in revwalk.take(max_count) {
            let commit = self.repo.find_commit(oid?)?;
            records.push(CommitRecord::from_commit(&commit));
        }

        Ok(records)
    }

    fn create_branch(&self, name: &str) -> Result<(), GitError> {
        let head = self
            .head_commit()?
            .ok_or_else(|| GitError::ref_not_found("Not a valid object name: 'HEAD'"))?;

        self.repo.branch(name, &head, false)?;
        Ok(())
    }

    fn list_branches(&self) -> Result<Vec<String>, GitError> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo.remote(name, url)?;
        Ok(())
    }

    fn push(&self, remote_name: &str, branch: &str, timeout: Duration) -> Result<(), GitError> {
        let deadline = deadline_after(timeout);
        let mut remote = self.repo.find_remote(remote_name)?;

        let local_ref = format!("refs/heads/{branch}");
        if self.repo.find_reference(&local_ref).is_err() {
            return Err(GitError::ref_not_found(format!(
                "src refspec {branch} does not match any"
            )));
        }
        let refspec = format!("{local_ref}:{local_ref}");

        let mut rejected: Option<String> = None;
        {
            let mut callbacks = self.remote_callbacks(deadline)?;
            callbacks.push_update_reference(|refname, status| {
                if let Some(reason) = status {
                    rejected = Some(format!("failed to push {refname}: {reason}"));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);

            remote
                .push(&[refspec.as_str()], Some(&mut push_options))
                .map_err(|e| network_error(e, "push", timeout, deadline))?;
        }

        match rejected {
            Some(reason) => Err(GitError::transport(reason)),
            None => Ok(()),
        }
    }

    fn pull(&self, remote_name: &str, branch: &str, timeout: Duration) -> Result<PullOutcome, GitError> {
        let deadline = deadline_after(timeout);
        let mut remote = self.repo.find_remote(remote_name)?;

        let tracking_ref = format!("refs/remotes/{remote_name}/{branch}");
        let refspec = format!("+refs/heads/{branch}:{tracking_ref}");

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks(deadline)?);
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| network_error(e, "pull", timeout, deadline))?;

        let fetched = self.repo.find_reference(&tracking_ref).map_err(|_| {
            GitError::ref_not_found(format!("couldn't find remote ref {branch}"))
        })?;
        let incoming = self.repo.reference_to_annotated_commit(&fetched)?;

        self.integrate(remote_name, branch, &incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::errors::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn author() -> AuthorIdentity {
        AuthorIdentity {
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
        }
    }

    fn create_test_repo() -> (TempDir, Git2Operations) {
        let temp_dir = TempDir::new().unwrap();
        let ops = Git2Operations::init(temp_dir.path(), "main", author()).unwrap();
        (temp_dir, ops)
    }

    fn commit_file(dir: &TempDir, ops: &Git2Operations, name: &str, contents: &str) -> String {
        fs::write(dir.path().join(name), contents).unwrap();
        ops.stage(Some(vec![name.to_string()])).unwrap();
        ops.commit(&format!("add {name}")).unwrap()
    }

    #[test]
    fn test_init_refuses_existing_repository() {
        let (temp_dir, _ops) = create_test_repo();
        let err = Git2Operations::init(temp_dir.path(), "main", author())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_open_missing_repository() {
        let temp_dir = TempDir::new().unwrap();
        let err = Git2Operations::open(temp_dir.path(), author()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RefNotFound);
    }

    #[test]
    fn test_status_counts() {
        let (temp_dir, ops) = create_test_repo();
        commit_file(&temp_dir, &ops, "tracked.txt", "one");

        fs::write(temp_dir.path().join("tracked.txt"), "two").unwrap();
        fs::write(temp_dir.path().join("new.txt"), "new").unwrap();
        fs::write(temp_dir.path().join("staged.txt"), "staged").unwrap();
        ops.stage(Some(vec!["staged.txt".to_string()])).unwrap();

        let counts = ops.status().unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                modified: 1,
                staged: 1,
                untracked: 1,
            }
        );
    }

    #[test]
    fn test_stage_all_includes_deletions() {
        let (temp_dir, ops) = create_test_repo();
        commit_file(&temp_dir, &ops, "gone.txt", "bye");

        fs::remove_file(temp_dir.path().join("gone.txt")).unwrap();
        ops.stage(None).unwrap();

        let counts = ops.status().unwrap();
        assert_eq!(counts.staged, 1);
        assert_eq!(counts.modified, 0);
    }

    #[test]
    fn test_stage_directory() {
        let (temp_dir, ops) = create_test_repo();
        fs::create_dir_all(temp_dir.path().join("src/nested")).unwrap();
        fs::write(temp_dir.path().join("src/a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("src/nested/b.txt"), "b").unwrap();
        fs::write(temp_dir.path().join("other.txt"), "other").unwrap();

        ops.stage(Some(vec!["src".to_string()])).unwrap();
        let counts = ops.status().unwrap();
        assert_eq!(counts.staged, 2);
        assert_eq!(counts.untracked, 1);

        ops.commit("add src").unwrap();
        fs::remove_dir_all(temp_dir.path().join("src")).unwrap();
        ops.stage(Some(vec!["src/".to_string()])).unwrap();
        let counts = ops.status().unwrap();
        assert_eq!(counts.staged, 2);
        assert_eq!(counts.modified, 0);
    }

    #[test]
    fn test_stage_absolute_path_inside_work_tree() {
        let (temp_dir, ops) = create_test_repo();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        let file = temp_dir.path().join("src/a.txt");
        fs::write(&file, "a").unwrap();

        ops.stage(Some(vec![file.to_string_lossy().into_owned()]))
            .unwrap();
        assert_eq!(ops.status().unwrap().staged, 1);

        let sha = ops.commit("add a").unwrap();
        assert_eq!(sha.len(), 40);
    }

    #[test]
    fn test_stage_path_outside_work_tree_is_invalid() {
        let (_temp_dir, ops) = create_test_repo();
        let elsewhere = TempDir::new().unwrap();
        let stray = elsewhere.path().join("stray.txt");
        fs::write(&stray, "x").unwrap();

        let err = ops
            .stage(Some(vec![stray.to_string_lossy().into_owned()]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = ops
            .stage(Some(vec!["../stray.txt".to_string()]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_stage_unknown_path_fails() {
        let (_temp_dir, ops) = create_test_repo();
        let err = ops.stage(Some(vec!["missing.txt".to_string()])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RefNotFound);
    }

    #[test]
    fn test_commit_without_changes_fails() {
        let (temp_dir, ops) = create_test_repo();
        assert_eq!(ops.commit("empty").unwrap_err().kind(), ErrorKind::NothingToCommit);

        commit_file(&temp_dir, &ops, "a.txt", "a");
        assert_eq!(ops.commit("again").unwrap_err().kind(), ErrorKind::NothingToCommit);
    }

    #[test]
    fn test_log_newest_first_and_bounded() {
        let (temp_dir, ops) = create_test_repo();
        assert!(ops.log(10).unwrap().is_empty());

        commit_file(&temp_dir, &ops, "a.txt", "a");
        let second = commit_file(&temp_dir, &ops, "b.txt", "b");

        let log = ops.log(1).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sha, short_sha(&second));
        assert_eq!(log[0].message, "add b.txt");

        assert_eq!(ops.log(10).unwrap().len(), 2);
    }

    #[test]
    fn test_branch_operations() {
        let (temp_dir, ops) = create_test_repo();
        assert_eq!(
            ops.create_branch("feature").unwrap_err().kind(),
            ErrorKind::RefNotFound
        );

        commit_file(&temp_dir, &ops, "a.txt", "a");
        ops.create_branch("feature").unwrap();
        assert_eq!(
            ops.create_branch("feature").unwrap_err().kind(),
            ErrorKind::DuplicateName
        );
        assert_eq!(
            ops.create_branch("bad..name").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let branches = ops.list_branches().unwrap();
        assert!(branches.contains(&"main".to_string()));
        assert!(branches.contains(&"feature".to_string()));
    }

    #[test]
    fn test_add_remote_twice() {
        let (_temp_dir, ops) = create_test_repo();
        ops.add_remote("origin", "https://example.com/repo.git").unwrap();
        let err = ops
            .add_remote("origin", "https://example.com/other.git")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_push_to_missing_remote() {
        let (temp_dir, ops) = create_test_repo();
        commit_file(&temp_dir, &ops, "a.txt", "a");
        let err = ops
            .push("origin", "main", Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RefNotFound);
    }

    #[test]
    fn test_network_error_reports_timeout_after_deadline() {
        let aborted = git2::Error::new(ErrorCode::User, ErrorClass::Callback, "aborted");
        let past = Instant::now() - Duration::from_millis(1);
        let err = network_error(aborted, "push", Duration::from_secs(3), Some(past));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "Operation 'push' timed out after 3s");
    }

    #[test]
    fn test_unbounded_timeout_has_no_deadline() {
        assert!(deadline_after(Duration::MAX).is_none());
        assert!(!expired(None));
        assert!(deadline_after(Duration::from_secs(60)).is_some());

        let aborted = git2::Error::new(ErrorCode::User, ErrorClass::Callback, "aborted");
        let err = network_error(aborted, "pull", Duration::MAX, None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_push_with_huge_timeout_does_not_panic() {
        let (temp_dir, ops) = create_test_repo();
        commit_file(&temp_dir, &ops, "a.txt", "a");
        let remote_dir = TempDir::new().unwrap();
        Repository::init_bare(remote_dir.path()).unwrap();
        ops.add_remote("origin", remote_dir.path().to_str().unwrap())
            .unwrap();

        ops.push("origin", "main", Duration::from_secs(u64::MAX)).unwrap();
        let outcome = ops.pull("origin", "main", Duration::MAX).unwrap();
        assert_eq!(outcome, PullOutcome::UpToDate);
    }
}
