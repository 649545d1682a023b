//! Racing a blocking call against the caller's cancellation signal.
//!
//! # Design
//! [`run_cancellable`] moves the blocking operation onto Tokio's blocking
//! pool and waits on a one-shot channel for its result while also waiting on
//! [`CallContext::done`]. Whichever resolves first is returned. When the
//! context wins, the worker keeps running; its send fails against the
//! dropped receiver and the result is discarded. The underlying HTTP call is
//! not interrupted.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RoadsError;

/// Why a [`CallContext`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl From<CancelReason> for RoadsError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Canceled => RoadsError::Canceled,
            CancelReason::DeadlineExceeded => RoadsError::DeadlineExceeded,
        }
    }
}

/// Cancellation signal for one or more calls: an explicit cancel token plus
/// an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never fires unless cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derived context: cancelled along with `self`, may be cancelled on its
    /// own without affecting `self`. The deadline is inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derived context that also fires after `timeout`, or at the parent's
    /// deadline if that comes first.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child_with_deadline(Instant::now() + timeout)
    }

    /// Derived context with the earlier of `deadline` and the parent's.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reason the context has already fired, if it has.
    pub fn err(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context fires. Pending forever for a background
    /// context that is never cancelled.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelReason::Canceled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Canceled
            }
        }
    }
}

/// Runs `op` on the blocking pool and returns its result, or the context's
/// cancellation error if that fires first.
pub async fn run_cancellable<T, F>(ctx: &CallContext, op: F) -> Result<T, RoadsError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RoadsError> + Send + 'static,
{
    if let Some(reason) = ctx.err() {
        return Err(reason.into());
    }

    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        if tx.send(op()).is_err() {
            log::trace!("caller stopped waiting; dropping late result");
        }
    });

    tokio::select! {
        biased;
        reason = ctx.done() => Err(reason.into()),
        outcome = rx => outcome.unwrap_or(Err(RoadsError::WorkerLost)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};

    use super::*;

    #[tokio::test]
    async fn returns_operation_result_when_it_finishes_first() {
        let ctx = CallContext::background();
        let value = run_cancellable(&ctx, || Ok(42)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn passes_operation_error_through() {
        let ctx = CallContext::background();
        let err = run_cancellable::<(), _>(&ctx, || Err(RoadsError::Auth("nope".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, RoadsError::Auth(msg) if msg == "nope"));
    }

    #[tokio::test]
    async fn deadline_wins_over_slow_operation() {
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let err = run_cancellable(&ctx, || {
            std::thread::sleep(Duration::from_millis(300));
            Ok("late")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RoadsError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn explicit_cancel_wins_and_late_result_is_discarded() {
        let ctx = CallContext::background();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let finished = Arc::new(AtomicBool::new(false));
        let worker_finished = Arc::clone(&finished);

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = run_cancellable(&ctx, move || {
            let _ = release_rx.recv();
            worker_finished.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RoadsError::Canceled));

        release_tx.send(()).unwrap();
        for _ in 0..100 {
            if finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn already_fired_context_skips_the_operation() {
        let ctx = CallContext::background();
        ctx.cancel();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let err = run_cancellable(&ctx, move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RoadsError::Canceled));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_worker_reports_worker_lost() {
        let ctx = CallContext::background();
        let err = run_cancellable::<(), _>(&ctx, || panic!("boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoadsError::WorkerLost));
    }

    #[test]
    fn child_follows_parent_but_not_the_reverse() {
        let parent = CallContext::background();
        let child = parent.child();
        child.cancel();
        assert_eq!(child.err(), Some(CancelReason::Canceled));
        assert_eq!(parent.err(), None);

        let child = parent.child();
        parent.cancel();
        assert_eq!(child.err(), Some(CancelReason::Canceled));
    }

    #[tokio::test]
    async fn child_with_timeout_keeps_parent_cancellation() {
        let parent = CallContext::background();
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert!(child.deadline().is_some());
        assert_eq!(child.err(), None);

        parent.cancel();
        assert_eq!(child.err(), Some(CancelReason::Canceled));
        assert_eq!(child.done().await, CancelReason::Canceled);
    }

    #[tokio::test]
    async fn child_with_timeout_fires_on_its_own_deadline() {
        let parent = CallContext::background();
        let child = parent.child_with_timeout(Duration::from_millis(20));
        let err = run_cancellable(&child, || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RoadsError::DeadlineExceeded));
        assert_eq!(parent.err(), None);
    }

    #[test]
    fn child_deadline_is_the_earlier_of_the_two() {
        let now = Instant::now();
        let parent = CallContext::with_deadline(now + Duration::from_secs(1));

        let tighter = parent.child_with_deadline(now + Duration::from_millis(100));
        assert_eq!(tighter.deadline(), Some(now + Duration::from_millis(100)));

        let looser = parent.child_with_deadline(now + Duration::from_secs(10));
        assert_eq!(looser.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn expired_deadline_reports_deadline_exceeded() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(ctx.done().await, CancelReason::DeadlineExceeded);
    }
}
