// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Execution Context
//!
//! Per-query state shared by the scans of one execution step: cooperative
//! cancellation and progress accounting.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::{Error, Result};

/// Execution context for a query step
///
/// Cloning is cheap and every clone observes the same cancellation flag
/// and progress counters.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
    /// Registered units of work
    num_tasks: Arc<AtomicUsize>,
    /// Finished units of work
    num_tasks_completed: Arc<AtomicUsize>,
}

impl ExecutionContext {
    /// Create a new execution context
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the query has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancel the query
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Get a cancellation handle that can be used from another thread
    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    /// Return `Error::QueryCancelled` once the query has been cancelled
    #[inline]
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::QueryCancelled)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Register `n` more units of work
    pub fn add_tasks(&self, n: usize) {
        self.num_tasks.fetch_add(n, Ordering::Relaxed);
    }

    /// Mark one unit of work as finished
    pub fn complete_task(&self) {
        self.num_tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn num_tasks(&self) -> usize {
        self.num_tasks.load(Ordering::Relaxed)
    }

    pub fn num_tasks_completed(&self) -> usize {
        self.num_tasks_completed.load(Ordering::Relaxed)
    }

    /// Completed fraction in `[0, 1]`, 1.0 when nothing is registered
    pub fn progress(&self) -> f64 {
        let total = self.num_tasks();
        if total == 0 {
            return 1.0;
        }
        (self.num_tasks_completed() as f64 / total as f64).min(1.0)
    }
}

/// Handle for cancelling a running query from another thread
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    /// Cancel the query
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if the query has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_cancellation() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check_cancelled().is_ok());

        let handle = ctx.cancellation_handle();
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check_cancelled(), Err(Error::QueryCancelled));
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = ExecutionContext::new();
        let other = ctx.clone();
        other.add_tasks(2);
        ctx.complete_task();
        assert_eq!(ctx.num_tasks(), 2);
        assert_eq!(other.num_tasks_completed(), 1);
        assert!((ctx.progress() - 0.5).abs() < f64::EPSILON);

        other.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_progress_without_tasks() {
        assert_eq!(ExecutionContext::new().progress(), 1.0);
    }

    #[test]
    fn test_cancel_from_thread() {
        let ctx = ExecutionContext::new();
        let handle = ctx.cancellation_handle();
        std::thread::spawn(move || handle.cancel())
            .join()
            .unwrap();
        assert!(ctx.is_cancelled());
    }
}
