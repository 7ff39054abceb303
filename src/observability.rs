use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use crate::git::{ErrorKind, GitError};

/// Repository operation counters, one set per session
#[derive(Debug, Default)]
pub struct OperationMetrics {
    pub total_operations: AtomicU64,
    pub failures: AtomicU64,
    pub unbound_rejections: AtomicU64,
    pub timeouts: AtomicU64,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &GitError) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        match error.kind() {
            ErrorKind::UnboundSession => {
                self.unbound_rejections.fetch_add(1, Ordering::Relaxed);
            }
            ErrorKind::Timeout => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn get_stats(&self) -> OperationStats {
        OperationStats {
            total_operations: self.total_operations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unbound_rejections: self.unbound_rejections.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Repository operation metrics: total={}, failures={}, unbound={}, timeouts={}",
            stats.total_operations, stats.failures, stats.unbound_rejections, stats.timeouts
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStats {
    pub total_operations: u64,
    pub failures: u64,
    pub unbound_rejections: u64,
    pub timeouts: u64,
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
