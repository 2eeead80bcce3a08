//! Optimistic update coordination.
//!
//! [`with_optimistic_update`] applies a mutation to in-memory state at once,
//! awaits the authoritative commit, and restores the previous state if the
//! commit fails. The caller's error is returned unchanged after rollback.
//!
//! ```text
//!   update() ──► commit().await ──┬─ Ok(v)  ──► Ok(v)
//!                                 └─ Err(e) ──► rollback() ─► notify ─► Err(e)
//!   (future dropped mid-commit)   ──────────► rollback() ─► notify
//! ```
//!
//! The coordinator is executor-agnostic: it owns no tasks and spawns
//! nothing. Mutual exclusion per target is the caller's job (see
//! [`crate::editor`]).

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

// ─────────────────────────────────────────────────────────────────────────────
// Error notices
// ─────────────────────────────────────────────────────────────────────────────

/// Transient, user-facing report of a rolled-back update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub description: Option<String>,
    /// Rendered commit error, or a fixed message for an abandoned commit.
    pub error: String,
    /// The update future was dropped before the commit settled.
    pub aborted: bool,
}

/// Receives notices for failed updates.
pub trait ErrorSink {
    fn notify(&self, notice: ErrorNotice);
}

/// In-memory [`ErrorSink`] that keeps every notice until drained.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<ErrorNotice>>,
}

impl NoticeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the pending notices, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ErrorNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take every pending notice.
    pub fn drain(&self) -> Vec<ErrorNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for NoticeLog {
    fn notify(&self, notice: ErrorNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

/// How a failed update is reported.
#[derive(Clone, Copy, Default)]
pub struct ErrorConfig<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    /// Where notices go. `None` reports through logging only.
    pub sink: Option<&'a dyn ErrorSink>,
}

impl<'a> ErrorConfig<'a> {
    #[must_use]
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            description: None,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn notify(mut self, sink: &'a dyn ErrorSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn report(&self, error: String, aborted: bool) {
        if let Some(sink) = self.sink {
            sink.notify(ErrorNotice {
                title: self.title.to_string(),
                description: self.description.map(str::to_string),
                error,
                aborted,
            });
        }
    }
}

impl fmt::Debug for ErrorConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorConfig")
            .field("title", &self.title)
            .field("description", &self.description)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the rollback unless disarmed, including when dropped mid-commit.
struct RollbackGuard<'a, R: FnOnce()> {
    rollback: Option<R>,
    error: ErrorConfig<'a>,
}

impl<R: FnOnce()> RollbackGuard<'_, R> {
    fn disarm(mut self) {
        self.rollback = None;
    }

    fn fire(mut self, error: String) {
        if let Some(rollback) = self.rollback.take() {
            rollback();
            self.error.report(error, false);
        }
    }
}

impl<R: FnOnce()> Drop for RollbackGuard<'_, R> {
    fn drop(&mut self) {
        if let Some(rollback) = self.rollback.take() {
            tracing::warn!(
                title = self.error.title,
                "optimistic update dropped before commit settled, rolling back"
            );
            rollback();
            self.error
                .report("update abandoned before it was saved".to_string(), true);
        }
    }
}

/// Apply `update` now, await `commit`, and run `rollback` if it fails.
///
/// - `update` runs synchronously before the first suspension point.
/// - On `Ok`, local state stays as `update` left it and the value is returned.
/// - On `Err`, `rollback` runs, a notice goes to `error.sink`, and the
///   original error is returned.
/// - If the returned future is dropped after `update` ran but before the
///   commit settled, `rollback` runs from the drop.
pub async fn with_optimistic_update<T, E, U, C, F, R>(
    update: U,
    commit: C,
    rollback: R,
    error: ErrorConfig<'_>,
) -> Result<T, E>
where
    U: FnOnce(),
    C: FnOnce() -> F,
    F: Future<Output = Result<T, E>>,
    R: FnOnce(),
    E: fmt::Display,
{
    update();
    let guard = RollbackGuard {
        rollback: Some(rollback),
        error,
    };

    match commit().await {
        Ok(value) => {
            guard.disarm();
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(title = error.title, error = %err, "commit failed, rolling back optimistic update");
            guard.fire(err.to_string());
            Err(err)
        }
    }
}
