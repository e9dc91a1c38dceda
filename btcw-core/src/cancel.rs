//! Caller-supplied deadline and cancellation for a transfer
//!
//! The pipeline checks a [`Cancellation`] between steps, and remote
//! collaborators use [`Cancellation::remaining`] to bound their blocking I/O.

use crate::error::{TransferError, TransferResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline plus a shared cancel flag
///
/// Cloning shares the flag, so a handle kept by another thread can cancel a
/// build in progress.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    /// No deadline, not cancelled
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Time budget for one blocking call: the smaller of `cap` and what is
    /// left before the deadline
    pub fn io_timeout(&self, cap: Duration) -> Duration {
        match self.remaining() {
            Some(left) => left.min(cap),
            None => cap,
        }
    }

    /// Fail if the build was cancelled or the deadline has passed
    pub fn check(&self) -> TransferResult<()> {
        if self.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(TransferError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
