use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::book::TaskBook;
use crate::datetime::due_date_serde;
use crate::reminder::ReminderGate;
use crate::task::{Task, TaskId};
use crate::update::AppState;

const DATA_FILE: &str = "tasks.json";

/// On-disk shape of the application state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub todo_tasks: Vec<Task>,

    #[serde(default)]
    pub task_id_counter: TaskId,

    #[serde(default, with = "due_date_serde")]
    pub last_reminder_check: Option<NaiveDate>,
}

impl Snapshot {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            todo_tasks: state.book.tasks().to_vec(),
            task_id_counter: state.book.next_id(),
            last_reminder_check: state.reminders.last_checked,
        }
    }

    pub fn into_state(self) -> AppState {
        AppState {
            book: TaskBook::from_parts(self.todo_tasks, self.task_id_counter),
            reminders: ReminderGate {
                last_checked: self.last_reminder_check,
            },
        }
    }
}

/// Opaque load/save of the full application state.
pub trait Persistence {
    fn load(&self) -> anyhow::Result<AppState>;
    fn save(&self, state: &AppState) -> anyhow::Result<()>;
}

/// Keeps one JSON document in a data directory, replaced atomically.
#[derive(Debug)]
pub struct JsonFileStore {
    pub data_dir: PathBuf,
    pub data_path: PathBuf,
}

impl JsonFileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let data_path = data_dir.join(DATA_FILE);
        info!(
            data_dir = %data_dir.display(),
            data = %data_path.display(),
            exists = data_path.exists(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            data_path,
        })
    }
}

impl Persistence for JsonFileStore {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<AppState> {
        if !self.data_path.exists() {
            debug!(file = %self.data_path.display(), "no data file yet; starting empty");
            return Ok(AppState::default());
        }

        let raw = fs::read_to_string(&self.data_path)
            .with_context(|| format!("failed reading {}", self.data_path.display()))?;
        if raw.trim().is_empty() {
            warn!(file = %self.data_path.display(), "data file is empty");
            return Ok(AppState::default());
        }

        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.data_path.display()))?;
        debug!(
            count = snapshot.todo_tasks.len(),
            counter = snapshot.task_id_counter,
            "loaded tasks"
        );
        Ok(snapshot.into_state())
    }

    #[tracing::instrument(skip(self, state))]
    fn save(&self, state: &AppState) -> anyhow::Result<()> {
        let snapshot = Snapshot::from_state(state);
        debug!(
            file = %self.data_path.display(),
            count = snapshot.todo_tasks.len(),
            "saving data atomically"
        );

        let dir = self.data_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &snapshot)?;
        writeln!(temp)?;
        temp.flush()?;

        temp.persist(&self.data_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.data_path.display(), err))?;
        Ok(())
    }
}

/// Non-durable store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<AppState>,
}

impl MemoryStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }
}

impl Persistence for MemoryStore {
    fn load(&self) -> anyhow::Result<AppState> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &AppState) -> anyhow::Result<()> {
        *self.state.borrow_mut() = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::task::TaskDraft;

    fn populated() -> AppState {
        let now = Utc
            .with_ymd_and_hms(2024, 6, 10, 9, 0, 0)
            .single()
            .expect("valid now");
        let mut state = AppState::default();
        state
            .book
            .add(
                TaskDraft::new("Dentist", "Checkup").with_due(NaiveDate::from_ymd_opt(2024, 6, 11)),
                now,
            )
            .expect("add");
        state.book.add(TaskDraft::new("Read", "Book"), now).expect("add");
        state.reminders.mark_checked(NaiveDate::from_ymd_opt(2024, 6, 10).expect("date"));
        state
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::open(temp.path()).expect("open");
        assert_eq!(store.load().expect("load"), AppState::default());
    }

    #[test]
    fn json_store_keeps_tasks_counter_and_gate() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::open(temp.path()).expect("open");
        let state = populated();
        store.save(&state).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, state);

        let raw = fs::read_to_string(&store.data_path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["taskIdCounter"], 2);
        assert_eq!(value["lastReminderCheck"], "2024-06-10");
        assert_eq!(value["todoTasks"][0]["dueDate"], "2024-06-11");
    }

    #[test]
    fn reads_blob_with_blank_due_dates() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::open(temp.path()).expect("open");
        fs::write(
            &store.data_path,
            r#"{"todoTasks":[{"id":3,"title":"a","body":"b","priority":"high",
               "category":"work","dueDate":"","completed":true,
               "createdAt":"2024-06-01T10:00:00.000Z"}],"taskIdCounter":4}"#,
        )
        .expect("write");

        let state = store.load().expect("load");
        let task = state.book.get(3).expect("task");
        assert_eq!(task.due_date, None);
        assert!(task.completed);
        assert_eq!(state.book.next_id(), 4);
        assert_eq!(state.reminders.last_checked, None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::open(temp.path()).expect("open");
        fs::write(&store.data_path, "{not json").expect("write");
        let err = store.load().expect_err("corrupt");
        assert!(format!("{err:#}").contains("failed parsing"));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::default();
        let state = populated();
        store.save(&state).expect("save");
        assert_eq!(store.load().expect("load"), state);
    }
}
