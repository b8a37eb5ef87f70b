//! Deadline and cancellation threaded through a resolution

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::feature::error::ResolutionError;

/// Bounds a resolution in time and lets the caller abandon it
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every resolution using the paired context
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl ResolveContext {
    /// A context that never times out and cannot be cancelled
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().deadline_at(Instant::now() + timeout)
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation signal, returning the handle that triggers it
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel = Some(receiver);
        (self, CancelHandle { sender })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `work` until it completes, the deadline passes, or the context is
    /// cancelled
    pub async fn run<T, F>(&self, work: F) -> Result<T, ResolutionError>
    where
        F: Future<Output = Result<T, ResolutionError>>,
    {
        if self.is_cancelled() {
            return Err(ResolutionError::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, work).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolutionError::TimedOut),
                },
                None => work.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = self.cancelled() => Err(ResolutionError::Cancelled),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn cancelled(&self) {
        if let Some(mut rx) = self.cancel.clone() {
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        // Dropped handle or no signal: never resolves
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_work_result() {
        let ctx = ResolveContext::unbounded();
        assert_eq!(ctx.run(async { Ok(7) }).await, Ok(7));
    }

    #[test]
    fn timeout_sets_deadline_from_now() {
        let before = Instant::now();
        let ctx = ResolveContext::with_timeout(Duration::from_secs(5));

        assert!(ctx.deadline().is_some_and(|d| d >= before + Duration::from_secs(5)));
        assert_eq!(ResolveContext::unbounded().deadline(), None);
    }

    #[tokio::test]
    async fn run_times_out_after_deadline() {
        let ctx = ResolveContext::with_timeout(Duration::from_millis(50));

        let result: Result<(), _> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(ResolutionError::TimedOut));
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let (ctx, handle) = ResolveContext::unbounded().cancellable();

        let work = ctx.run(async {
            std::future::pending::<()>().await;
            Ok(())
        });
        let (result, _) = tokio::join!(work, async { handle.cancel() });

        assert_eq!(result, Err(ResolutionError::Cancelled));
    }

    #[tokio::test]
    async fn run_refuses_work_after_cancel() {
        let (ctx, handle) = ResolveContext::unbounded().cancellable();
        handle.cancel();

        assert_eq!(ctx.run(async { Ok(1) }).await, Err(ResolutionError::Cancelled));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = ResolveContext::unbounded().cancellable();
        drop(handle);

        assert_eq!(ctx.run(async { Ok(1) }).await, Ok(1));
    }
}
