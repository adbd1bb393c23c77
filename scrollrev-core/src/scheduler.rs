//! Low-priority work queue.
//!
//! Work that can wait (publishing a visibility update, dispatching a load
//! batch) is parked here and drained by the event loop only when no input
//! is pending, so bursts of scrolling never wait behind background work.
//! A host without an idle slot pops everything right away, which degrades
//! to immediate application.

use std::collections::{BTreeSet, VecDeque};

use crate::types::FileRef;

/// Deferred session work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleTask {
    /// Publish a flushed visibility set.
    PublishVisibility(BTreeSet<FileRef>),
    /// Recompute the load queue and dispatch the next batch.
    DispatchLoads,
}

#[derive(Debug, Default)]
pub struct IdleQueue {
    tasks: VecDeque<IdleTask>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task`.
    ///
    /// A newer visibility set supersedes a queued one, and a dispatch request
    /// is only queued once; both are idempotent when drained.
    pub fn push(&mut self, task: IdleTask) {
        match &task {
            IdleTask::PublishVisibility(_) => {
                self.tasks.retain(|t| !matches!(t, IdleTask::PublishVisibility(_)));
            }
            IdleTask::DispatchLoads => {
                if self.tasks.contains(&IdleTask::DispatchLoads) {
                    return;
                }
            }
        }
        self.tasks.push_back(task);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pop(&mut self) -> Option<IdleTask> {
        self.tasks.pop_front()
    }
}
