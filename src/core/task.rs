//! # Background Task Handles
//!
//! Every repeating loop in the agent (reminder refetch, due-check, in-alarm
//! sound repeat) is spawned through [`TaskHandle`], which aborts the task when
//! the handle is stopped or dropped. A started loop can therefore never
//! outlive its owner — there is no way to leak a dangling timer.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

use std::future::Future;
use tokio::task::JoinHandle;

/// Owning handle for a spawned background loop
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn a future on the runtime and return its owning handle
    pub fn spawn<F>(name: &'static str, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        log::debug!("background task '{name}' started");
        TaskHandle {
            name,
            handle: tokio::spawn(fut),
        }
    }

    /// Stop the task. Equivalent to dropping the handle; named for call sites
    /// where the intent should be explicit.
    pub fn stop(self) {}

    /// Whether the underlying task has already run to completion
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.handle.abort();
        log::debug!("background task '{}' stopped", self.name);
    }
}
