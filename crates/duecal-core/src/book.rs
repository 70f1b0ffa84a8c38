use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::classify::is_overdue;
use crate::error::{CoreError, CoreResult};
use crate::task::{Task, TaskDraft, TaskId};

/// The in-memory task set and its id counter.
///
/// Ids come from `next_id` and are never handed out twice, even after
/// delete or clear-all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBook {
    tasks: Vec<Task>,
    next_id: TaskId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl TaskBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a book from stored parts. The counter is raised past the
    /// highest stored id if the stored counter lags behind.
    pub fn from_parts(tasks: Vec<Task>, next_id: TaskId) -> Self {
        let floor = tasks
            .iter()
            .map(|t| t.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        if floor > next_id {
            debug!(stored = next_id, floor, "raising stale id counter");
        }
        Self {
            next_id: next_id.max(floor),
            tasks,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> CoreResult<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(CoreError::NotFound(id))
    }

    fn get_mut(&mut self, id: TaskId) -> CoreResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CoreError::NotFound(id))
    }

    #[instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> CoreResult<TaskId> {
        let draft = draft.validated()?;
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| CoreError::validation("task id space exhausted"))?;
        self.tasks.push(Task::from_draft(id, draft, now));
        info!(id, total = self.tasks.len(), "added task");
        Ok(id)
    }

    #[instrument(skip(self, draft, now))]
    pub fn edit(&mut self, id: TaskId, draft: TaskDraft, now: DateTime<Utc>) -> CoreResult<()> {
        let draft = draft.validated()?;
        let task = self.get_mut(id)?;
        task.apply_draft(draft, now);
        info!(id, "edited task");
        Ok(())
    }

    /// Flips completion and returns the new state.
    #[instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: TaskId) -> CoreResult<bool> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        info!(id, completed = task.completed, "toggled completion");
        Ok(task.completed)
    }

    #[instrument(skip(self))]
    pub fn delete(&mut self, id: TaskId) -> CoreResult<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(CoreError::NotFound(id))?;
        let removed = self.tasks.remove(idx);
        info!(id, remaining = self.tasks.len(), "deleted task");
        Ok(removed)
    }

    /// Removes every task; the id counter is kept.
    #[instrument(skip(self))]
    pub fn clear_all(&mut self) -> CoreResult<usize> {
        if self.tasks.is_empty() {
            return Err(CoreError::validation("no tasks to clear"));
        }
        let removed = self.tasks.len();
        self.tasks.clear();
        info!(removed, "cleared all tasks");
        Ok(removed)
    }

    /// Overdue counts pending tasks only.
    pub fn stats(&self, today: NaiveDate) -> Stats {
        self.tasks.iter().fold(
            Stats {
                total: self.tasks.len(),
                ..Stats::default()
            },
            |mut stats, task| {
                if task.completed {
                    stats.completed += 1;
                } else {
                    stats.pending += 1;
                    if is_overdue(today, task.due_date) {
                        stats.overdue += 1;
                    }
                }
                stats
            },
        )
    }
}
