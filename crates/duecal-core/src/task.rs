use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::due_date_serde;
use crate::error::CoreError;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        // Single-letter forms: l, m, h.
        Priority::ALL
            .into_iter()
            .find(|priority| {
                let name = priority.as_str();
                name == lower || (lower.len() == 1 && name.starts_with(lower.as_str()))
            })
            .ok_or_else(|| CoreError::validation(format!("unknown priority: {lower}")))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Shopping,
    Health,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == lower)
            .ok_or_else(|| CoreError::validation(format!("unknown category: {lower}")))
    }
}

/// A single user-created item. Field names follow the stored JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    pub body: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub category: Category,

    #[serde(default, with = "due_date_serde")]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// User-supplied fields for add and edit. Text is validated by the book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub category: Category,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_due(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Trims title and body; both must be non-empty afterwards.
    pub(crate) fn validated(self) -> Result<Self, CoreError> {
        let title = self.title.trim().to_string();
        let body = self.body.trim().to_string();
        if title.is_empty() || body.is_empty() {
            return Err(CoreError::validation(
                "title and description must both be filled in",
            ));
        }
        Ok(Self { title, body, ..self })
    }
}

impl Task {
    pub fn from_draft(id: TaskId, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            body: draft.body,
            priority: draft.priority,
            category: draft.category,
            due_date: draft.due_date,
            completed: false,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    pub(crate) fn apply_draft(&mut self, draft: TaskDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.body = draft.body;
        self.priority = draft.priority;
        self.category = draft.category;
        self.due_date = draft.due_date;
        self.updated_at = Some(now);
    }
}
