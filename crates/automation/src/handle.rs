//! Teardown handle for background watch tasks.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned watch task (change feed or region events).
///
/// `stop` is idempotent and dropping the handle stops the task.
pub struct WatchHandle {
    name: &'static str,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Spawn `f` on the current runtime. The closure receives the token it
    /// must watch to exit.
    pub(crate) fn spawn<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(f(token.clone()));
        Self {
            name,
            token,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the task to stop. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(watch = self.name, "Stopping watch");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to exit on its own, e.g. after its feed closed.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(watch = self.name, error = %e, "Watch task ended abnormally");
            }
        }
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(watch = self.name, error = %e, "Watch task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("name", &self.name)
            .field("stopped", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);
        let handle = WatchHandle::spawn("test", |token| async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(!handle.is_stopped());
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        handle.shutdown().await;
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = WatchHandle::spawn("test", |token| async move {
            token.cancelled().await;
            let _ = tx.send(());
        });
        drop(handle);
        assert!(rx.await.is_ok());
    }
}
