//! Task spawning abstraction.
//!
//! The engine and event bus hand off background work (media pre-fetch, play
//! statistics, subscriber workers) through [`TaskSpawner`] so that callers on
//! latency-sensitive paths, such as the advance loop, never await it.

use std::future::Future;

/// Abstraction for spawning detached background tasks.
///
/// Spawned tasks run independently of the caller. The spawner does not
/// provide a way to cancel or join them; long-lived tasks take a
/// cancellation token instead.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner bound to a runtime handle.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn spawned_task_runs_detached() {
        let spawner = TokioSpawner::current();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        spawner.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });

        rx.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
