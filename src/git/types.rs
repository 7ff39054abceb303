use chrono::{FixedOffset, Offset, TimeZone, Utc};
use git2::Commit;
use serde::{Deserialize, Serialize};

/// Length of the abbreviated commit hashes handed out to callers.
pub const SHORT_SHA_LEN: usize = 8;

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

/// Identity used for commits when the repository has no `user.name`/`user.email`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
}

/// Per-category file counts, not diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusCounts {
    pub modified: usize,
    pub staged: usize,
    pub untracked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    /// RFC 3339 timestamp in the committer's own UTC offset.
    pub date: String,
}

impl CommitRecord {
    pub fn from_commit(commit: &Commit<'_>) -> Self {
        let time = commit.time();
        let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
        let date = offset
            .timestamp_opt(time.seconds(), 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        Self {
            sha: short_sha(&commit.id().to_string()),
            message: String::from_utf8_lossy(commit.message_bytes())
                .trim()
                .to_string(),
            author: String::from_utf8_lossy(commit.author().name_bytes()).into_owned(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitSummary {
    pub sha: String,
}

/// How a pull integrated the fetched branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullOutcome {
    UpToDate,
    FastForward { sha: String },
    Merged { sha: String },
}
