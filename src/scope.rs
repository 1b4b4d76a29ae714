//! View lifetimes
//!
//! A [`ViewScope`] owns the listeners and fetch tasks a view starts. Dropping
//! the scope aborts them all, so a response that arrives after the view is
//! gone is never applied.

use std::future::Future;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::sync::{AttendeeUpdate, EnrollmentSync};

/// Tasks bound to one view
#[derive(Default)]
pub struct ViewScope {
    name: String,
    tasks: Vec<JoinHandle<()>>,
}

impl ViewScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Call `handler` for every attendee update until the scope is dropped
    pub fn listen<F>(&mut self, sync: &EnrollmentSync, mut handler: F)
    where
        F: FnMut(AttendeeUpdate) + Send + 'static,
    {
        let mut updates = sync.subscribe();
        let view = self.name.clone();

        self.tasks.push(tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => handler(update),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(view = %view, skipped, "Listener lagged, updates dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Run a fetch whose result only matters while the view is alive
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    /// Tasks still running
    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            tracing::debug!(view = %self.name, tasks = self.tasks.len(), "Closing view scope");
        }
        self.cancel_all();
    }
}
