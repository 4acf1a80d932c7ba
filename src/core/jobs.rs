//! # Job Group
//!
//! Registry of the tasks an executor has spawned, so they can be aborted in
//! bulk without tearing down the executor itself.

use log::debug;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Debug, Default)]
pub struct JobGroup {
    handles: Mutex<Vec<AbortHandle>>,
}

impl JobGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on `runtime` and registers it with this group.
    pub fn spawn<F>(&self, runtime: &Handle, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let task = runtime.spawn(future);
        let mut handles = self.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(task.abort_handle());
        task
    }

    /// Aborts every registered job. Returns how many were still running.
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<AbortHandle> = self.lock().drain(..).collect();
        let mut cancelled = 0;
        for handle in handles {
            if !handle.is_finished() {
                cancelled += 1;
            }
            handle.abort();
        }
        if cancelled > 0 {
            debug!("Cancelled {} running job(s)", cancelled);
        }
        cancelled
    }

    /// Number of jobs that have not finished yet.
    pub fn active(&self) -> usize {
        self.lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AbortHandle>> {
        // A panic while holding this lock cannot leave the Vec inconsistent.
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
