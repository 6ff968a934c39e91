//! Execution context shared by every store call of one batch: a deadline plus
//! an explicit cancel signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rgo_core::{Error, Result};
use tokio::sync::watch;
use tokio::time::Instant;

pub const APPLY_TIMEOUT: Duration = Duration::from_secs(90);
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(60);

/// Cancels every context cloned from the one it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct ExecContext {
    cancel_rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl ExecContext {
    /// Context without a deadline.
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel_rx: rx, deadline: None }, CancelHandle { tx: Arc::new(tx) })
    }

    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> (Self, CancelHandle) {
        let (mut ctx, handle) = Self::new();
        ctx.deadline = Some(Instant::now() + timeout);
        (ctx, handle)
    }

    pub fn is_cancelled(&self) -> bool { *self.cancel_rx.borrow() }

    /// Fail fast if the batch should not start another call.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run one store call. The call future is dropped (aborting any in-flight
    /// request) as soon as the context is cancelled or the deadline passes.
    pub async fn guard<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        let mut rx = self.cancel_rx.clone();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without cancelling: never fires.
                    std::future::pending::<()>().await;
                }
            }
        };
        let expired = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled => Err(Error::Cancelled),
            _ = expired => Err(Error::DeadlineExceeded),
            r = call => r,
        }
    }
}
