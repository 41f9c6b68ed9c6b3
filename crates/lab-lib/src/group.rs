//! Fail-fast task groups
//!
//! A `TaskGroup` spawns one Tokio task per item. All members share a
//! cancellation token derived from the caller's; the first member error
//! cancels it and is what `wait` returns. Members are never aborted, they
//! observe the token cooperatively, and errors after the first are dropped.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct TaskGroup<T> {
    set: JoinSet<Result<T>>,
    token: CancellationToken,
    limit: Option<Arc<Semaphore>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Create an unbounded group whose token is a child of `parent`
    pub fn new(parent: &CancellationToken) -> Self {
        Self::with_limit(parent, 0)
    }

    /// Create a group running at most `limit` members at once, 0 is unbounded
    pub fn with_limit(parent: &CancellationToken, limit: usize) -> Self {
        Self {
            set: JoinSet::new(),
            token: parent.child_token(),
            limit: (limit > 0).then(|| Arc::new(Semaphore::new(limit))),
        }
    }

    /// Token shared by every member of the group
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Spawn a member; `f` receives the group's token
    pub fn spawn<F, Fut>(&mut self, f: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let token = self.token.clone();
        let limit = self.limit.clone();
        let member = f(token.clone());

        self.set.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => Some(
                    semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::Cancelled)?,
                ),
                None => None,
            };
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            member.await
        });
    }

    /// Join every member; returns outputs in completion order or the first error
    pub async fn wait(mut self) -> Result<Vec<T>> {
        let mut outputs = Vec::with_capacity(self.set.len());
        let mut first_error: Option<Error> = None;

        while let Some(joined) = self.set.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(Error::Join(e.to_string())));
            match result {
                Ok(output) => {
                    if first_error.is_none() {
                        outputs.push(output);
                    }
                }
                Err(err) if first_error.is_none() => {
                    self.token.cancel();
                    first_error = Some(err);
                }
                Err(err) => {
                    debug!(error = %err, "Discarding error after first group failure");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_all_outputs() {
        let root = CancellationToken::new();
        let mut group = TaskGroup::new(&root);
        for i in 0..5usize {
            group.spawn(move |_| async move { Ok(i * 2) });
        }

        let mut outputs = group.wait().await.unwrap();
        outputs.sort();
        assert_eq!(outputs, vec![0, 2, 4, 6, 8]);
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn test_first_error_wins_and_later_errors_are_discarded() {
        let root = CancellationToken::new();
        let mut group: TaskGroup<()> = TaskGroup::new(&root);

        group.spawn(|_| async { Err(Error::Connectivity("first".into())) });
        group.spawn(|token| async move {
            token.cancelled().await;
            Err(Error::Connectivity("second".into()))
        });

        match group.wait().await {
            Err(Error::Connectivity(msg)) => assert_eq!(msg, "first"),
            other => panic!("unexpected result: {:?}", other),
        }
        // the group's token is a child, the caller's token is untouched
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn test_siblings_observe_cancellation() {
        let root = CancellationToken::new();
        let mut group: TaskGroup<&'static str> = TaskGroup::new(&root);
        let observed = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let observed = observed.clone();
            group.spawn(move |token| async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        observed.fetch_add(1, Ordering::SeqCst);
                        Err(Error::Cancelled)
                    }
                    _ = tokio::time::sleep(Duration::from_secs(30)) => Ok("slow"),
                }
            });
        }
        group.spawn(|_| async { Err(Error::task("n1", "boom")) });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, Error::TaskExecution { .. }));
        assert_eq!(observed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_members() {
        let root = CancellationToken::new();
        root.cancel();

        let mut group: TaskGroup<()> = TaskGroup::new(&root);
        group.spawn(|_| async { Ok(()) });
        assert!(matches!(group.wait().await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_limit_bounds_concurrency() {
        let root = CancellationToken::new();
        let mut group: TaskGroup<()> = TaskGroup::with_limit(&root, 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = running.clone();
            let peak = peak.clone();
            group.spawn(move |_| async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        group.wait().await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
