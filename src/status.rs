//! Task status cycle.
//!
//! ```text
//! pending -> in-progress -> completed -> pending
//! ```
//!
//! There is no terminal state; a completed task goes back to pending on the
//! next advance.

use crate::models::{Task, TaskPatch, TaskStatus};

impl TaskStatus {
    /// The status one user action further along the cycle.
    pub fn next(self) -> TaskStatus {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl Task {
    /// Moves the task one step along the cycle and returns the new status.
    pub fn advance(&mut self) -> TaskStatus {
        self.status = self.status.next();
        self.status
    }

    /// Applies a free-form edit. Never touches `status`.
    ///
    /// An empty description clears it.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = if description.trim().is_empty() { None } else { Some(description) };
        }
    }
}
