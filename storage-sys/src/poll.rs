// SPDX-License-Identifier: GPL-3.0-only

//! Bounded polling for state that converges asynchronously (e.g. the kernel
//! picking up a new partition after `partprobe`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, SysError};

/// Shared flag that aborts a running [`Poller`] from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Repeats a probe with exponential backoff until it yields a value,
/// the timeout elapses, or the cancel token fires.
#[derive(Debug, Clone)]
pub struct Poller {
    initial_interval: Duration,
    max_interval: Duration,
    timeout: Duration,
    cancel: Option<CancelToken>,
}

impl Poller {
    pub fn new(initial_interval: Duration, max_interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval,
            max_interval: max_interval.max(initial_interval),
            timeout,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call `probe` until it returns `Some`.
    ///
    /// The probe always runs at least once. Its errors end polling at once.
    pub fn poll<T, F>(&self, operation: &str, mut probe: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<Option<T>>,
    {
        let started = Instant::now();
        let mut interval = self.initial_interval;
        let mut attempt = 0u32;

        loop {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(SysError::Cancelled(operation.to_string()));
            }

            attempt += 1;
            if let Some(value) = probe(attempt)? {
                debug!("{operation} converged after {attempt} attempt(s)");
                return Ok(value);
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(SysError::Timeout {
                    operation: operation.to_string(),
                    waited,
                });
            }

            thread::sleep(interval.min(self.timeout - waited));
            interval = interval.saturating_mul(2).min(self.max_interval);
        }
    }
}
