use std::str::FromStr;

use tracing::trace;

use crate::error::CoreError;
use crate::task::{
  Category,
  Priority,
  Task
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Pending,
  Completed
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Only(Priority)
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category)
}

impl StatusFilter {
  fn matches(self, task: &Task) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Pending => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
    }
  }
}

impl PriorityFilter {
  fn matches(self, task: &Task) -> bool {
    match self {
      | PriorityFilter::All => true,
      | PriorityFilter::Only(p) => {
        task.priority == p
      }
    }
  }
}

impl CategoryFilter {
  fn matches(self, task: &Task) -> bool {
    match self {
      | CategoryFilter::All => true,
      | CategoryFilter::Only(c) => {
        task.category == c
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = CoreError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "pending" => {
        Ok(StatusFilter::Pending)
      }
      | "completed" | "done" => {
        Ok(StatusFilter::Completed)
      }
      | other => {
        Err(CoreError::validation(
          format!(
            "unknown status filter: \
             {other}"
          )
        ))
      }
    }
  }
}

impl FromStr for PriorityFilter {
  type Err = CoreError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(PriorityFilter::All);
    }
    s.parse::<Priority>()
      .map(PriorityFilter::Only)
  }
}

impl FromStr for CategoryFilter {
  type Err = CoreError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(CategoryFilter::All);
    }
    s.parse::<Category>()
      .map(CategoryFilter::Only)
  }
}

/// Conjunction of the three list filters. The default passes everything.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct TaskFilter {
  pub status:   StatusFilter,
  pub priority: PriorityFilter,
  pub category: CategoryFilter
}

impl TaskFilter {
  /// Builds a filter from the textual selector values; `None` means all.
  pub fn parse(
    status: Option<&str>,
    priority: Option<&str>,
    category: Option<&str>
  ) -> Result<Self, CoreError> {
    Ok(Self {
      status:   status
        .map(str::parse::<StatusFilter>)
        .transpose()?
        .unwrap_or_default(),
      priority: priority
        .map(str::parse::<PriorityFilter>)
        .transpose()?
        .unwrap_or_default(),
      category: category
        .map(str::parse::<CategoryFilter>)
        .transpose()?
        .unwrap_or_default()
    })
  }

  pub fn is_unfiltered(&self) -> bool {
    *self == Self::default()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let ok = self.status.matches(task)
      && self.priority.matches(task)
      && self.category.matches(task);
    trace!(id = task.id, ok, "filter evaluation");
    ok
  }

  /// Matching tasks in input order.
  #[tracing::instrument(skip(self, tasks), fields(filter = ?self))]
  pub fn apply<'a, I>(
    &self,
    tasks: I
  ) -> Vec<&'a Task>
  where
    I: IntoIterator<Item = &'a Task>
  {
    tasks
      .into_iter()
      .filter(|task| self.matches(task))
      .collect()
  }
}
