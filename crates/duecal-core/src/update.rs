use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::book::TaskBook;
use crate::error::{CoreError, CoreResult};
use crate::reminder::{ReminderGate, TierSummary, check_reminders};
use crate::task::{TaskDraft, TaskId};

/// Everything that is persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub book: TaskBook,
    pub reminders: ReminderGate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(TaskDraft),
    Edit { id: TaskId, draft: TaskDraft },
    ToggleComplete(TaskId),
    Delete(TaskId),
    ClearAll,
    CheckReminders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// Side effects for the presentation layer to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Toast { level: ToastLevel, message: String },
    Notify(TierSummary),
    Persist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: AppState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn changed(state: AppState, message: String) -> Self {
        Self {
            state,
            effects: vec![
                Effect::Persist,
                Effect::Toast {
                    level: ToastLevel::Success,
                    message,
                },
            ],
        }
    }
}

/// Applies one command to a copy of `state`.
///
/// On error `state` is untouched and no effects are produced.
#[instrument(skip(state, now))]
pub fn update(
    state: &AppState,
    command: Command,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> CoreResult<Transition> {
    let mut next = state.clone();
    let transition = match command {
        Command::Add(draft) => {
            let id = next.book.add(draft, now)?;
            Transition::changed(next, format!("Added task {id}"))
        }
        Command::Edit { id, draft } => {
            next.book.edit(id, draft, now)?;
            Transition::changed(next, format!("Updated task {id}"))
        }
        Command::ToggleComplete(id) => {
            let completed = next.book.toggle_complete(id)?;
            let message = if completed {
                format!("Task {id} marked complete")
            } else {
                format!("Task {id} marked incomplete")
            };
            Transition::changed(next, message)
        }
        Command::Delete(id) => {
            let removed = next.book.delete(id)?;
            Transition::changed(next, format!("Deleted \"{}\"", removed.title))
        }
        Command::ClearAll => {
            let removed = next.book.clear_all()?;
            Transition::changed(next, format!("Cleared {removed} tasks"))
        }
        Command::CheckReminders => {
            let check = check_reminders(next.book.tasks(), today, next.reminders);
            let gate_moved = check.gate != next.reminders;
            next.reminders = check.gate;
            let mut effects: Vec<Effect> = check.alerts.into_iter().map(Effect::Notify).collect();
            if gate_moved {
                effects.push(Effect::Persist);
            }
            Transition {
                state: next,
                effects,
            }
        }
    };
    debug!(effects = transition.effects.len(), "command applied");
    Ok(transition)
}

/// Like [`update`], but turns a rejected command into an error toast on
/// the unchanged state.
pub fn update_or_report(
    state: &AppState,
    command: Command,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Transition {
    match update(state, command, now, today) {
        Ok(transition) => transition,
        Err(err) => {
            warn!(error = %err, "command rejected");
            Transition {
                state: state.clone(),
                effects: vec![Effect::Toast {
                    level: toast_level_for(&err),
                    message: err.to_string(),
                }],
            }
        }
    }
}

fn toast_level_for(err: &CoreError) -> ToastLevel {
    match err {
        CoreError::NotFound(_) => ToastLevel::Info,
        CoreError::InvalidDate { .. } | CoreError::Validation(_) => ToastLevel::Error,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::classify::Tier;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0)
            .single()
            .expect("valid now")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date")
    }

    #[test]
    fn add_produces_persist_and_toast() {
        let state = AppState::default();
        let t = update(
            &state,
            Command::Add(TaskDraft::new("Pay rent", "June")),
            now(),
            today(),
        )
        .expect("add");
        assert_eq!(t.state.book.len(), 1);
        assert!(state.book.is_empty());
        assert_eq!(t.effects[0], Effect::Persist);
        assert!(matches!(
            &t.effects[1],
            Effect::Toast { level: ToastLevel::Success, .. }
        ));
    }

    #[test]
    fn rejected_commands_keep_state() {
        let state = AppState::default();
        assert_eq!(
            update(&state, Command::Delete(3), now(), today()),
            Err(CoreError::NotFound(3))
        );

        let t = update_or_report(
            &state,
            Command::Add(TaskDraft::new("", "")),
            now(),
            today(),
        );
        assert_eq!(t.state, state);
        assert_eq!(t.effects.len(), 1);
        assert!(matches!(
            &t.effects[0],
            Effect::Toast { level: ToastLevel::Error, .. }
        ));
    }

    #[test]
    fn toggle_twice_restores_pending() {
        let state = AppState::default();
        let t = update(&state, Command::Add(TaskDraft::new("a", "b")), now(), today())
            .expect("add");
        let t = update(&t.state, Command::ToggleComplete(0), now(), today()).expect("toggle");
        assert!(t.state.book.get(0).expect("task").completed);
        let t = update(&t.state, Command::ToggleComplete(0), now(), today()).expect("toggle");
        assert!(!t.state.book.get(0).expect("task").completed);
    }

    #[test]
    fn reminder_check_notifies_once_per_day() {
        let state = AppState::default();
        let overdue = TaskDraft::new("late", "x")
            .with_due(NaiveDate::from_ymd_opt(2024, 6, 8));
        let t = update(&state, Command::Add(overdue), now(), today()).expect("add");

        let first = update(&t.state, Command::CheckReminders, now(), today()).expect("check");
        let notified: Vec<&TierSummary> = first
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify(summary) => Some(summary),
                _ => None,
            })
            .collect();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].tier, Tier::Overdue);
        assert!(first.effects.contains(&Effect::Persist));

        let second =
            update(&first.state, Command::CheckReminders, now(), today()).expect("check");
        assert!(second.effects.is_empty());
    }
}
