use std::io::Write;
use std::thread;

use anyhow::{Context, bail};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{build_grid, parse_month, shift_month};
use crate::cli::{CliCommand, FilterArgs, TaskFields};
use crate::config::Config;
use crate::datastore::Persistence;
use crate::datetime::{parse_day, today_in_project};
use crate::filter::TaskFilter;
use crate::reminder::build_reminders;
use crate::render::Renderer;
use crate::task::{Category, Priority, Task, TaskDraft};
use crate::update::{AppState, Command, Effect, Transition, update, update_or_report};

/// Source of "now" and "today". `pinned_today` replaces the project-local
/// date for every check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    pub pinned_today: Option<NaiveDate>,
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.pinned_today.unwrap_or_else(|| today_in_project(now))
    }
}

#[instrument(skip(store, cfg, renderer, command))]
pub fn dispatch<W: Write>(
    store: &dyn Persistence,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    command: CliCommand,
    clock: Clock,
) -> anyhow::Result<()> {
    let now = clock.now();
    let today = clock.today(now);
    let state = store.load()?;

    debug!(?command, %today, tasks = state.book.len(), "dispatching command");

    match command {
        CliCommand::Add { title, body, fields } => {
            let draft = TaskDraft {
                title,
                body,
                ..TaskDraft::default()
            };
            let draft = apply_fields(draft, &fields, today)?;
            execute(store, cfg, renderer, &state, Command::Add(draft), now, today).map(drop)
        }
        CliCommand::Edit {
            id,
            title,
            body,
            fields,
            no_due,
        } => {
            let existing = state.book.get(id)?;
            let mut draft = draft_from(existing);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(body) = body {
                draft.body = body;
            }
            let mut draft = apply_fields(draft, &fields, today)?;
            if no_due {
                draft.due_date = None;
            }
            let command = Command::Edit { id, draft };
            execute(store, cfg, renderer, &state, command, now, today).map(drop)
        }
        CliCommand::Done { id } => execute(
            store,
            cfg,
            renderer,
            &state,
            Command::ToggleComplete(id),
            now,
            today,
        )
        .map(drop),
        CliCommand::Delete { id } => {
            execute(store, cfg, renderer, &state, Command::Delete(id), now, today).map(drop)
        }
        CliCommand::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every task without --yes");
            }
            execute(store, cfg, renderer, &state, Command::ClearAll, now, today).map(drop)
        }
        CliCommand::Show { id } => renderer.print_task_info(state.book.get(id)?, today),
        CliCommand::List { filter } => {
            let filter = task_filter(&filter)?;
            let tasks = filter.apply(state.book.tasks());
            renderer.print_task_table(&tasks, today)
        }
        CliCommand::Calendar {
            month,
            shift,
            filter,
        } => {
            let (year, month) = match month {
                Some(raw) => parse_month(&raw)?,
                None => (today.year(), today.month()),
            };
            let (year, month) = shift_month(year, month, shift)?;
            let filter = task_filter(&filter)?;
            let tasks = filter.apply(state.book.tasks());
            let grid = build_grid(year, month, tasks, today)?;
            renderer.print_month(&grid)
        }
        CliCommand::Reminders => {
            let reminders = build_reminders(state.book.tasks(), today);
            renderer.print_reminders(&reminders)
        }
        CliCommand::Check => {
            let notified = execute(
                store,
                cfg,
                renderer,
                &state,
                Command::CheckReminders,
                now,
                today,
            )?;
            if notified == 0 {
                info!(%today, "no reminder alerts");
            }
            Ok(())
        }
        CliCommand::Watch => watch(store, cfg, renderer, clock),
        CliCommand::Stats => renderer.print_stats(&state.book.stats(today)),
    }
}

/// Runs `command` through the reducer and carries out its effects.
fn execute<W: Write>(
    store: &dyn Persistence,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    state: &AppState,
    command: Command,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> anyhow::Result<usize> {
    let transition = update(state, command, now, today)?;
    apply_effects(store, cfg, renderer, &transition)
}

/// Carries out effects in order. Returns how many alerts were shown.
fn apply_effects<W: Write>(
    store: &dyn Persistence,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    transition: &Transition,
) -> anyhow::Result<usize> {
    let mut notified = 0;
    for effect in &transition.effects {
        match effect {
            Effect::Persist => store
                .save(&transition.state)
                .context("failed to save tasks")?,
            Effect::Toast { level, message } => renderer.print_toast(*level, message)?,
            Effect::Notify(summary) => {
                if cfg.notifications_enabled() {
                    renderer.print_notification(summary)?;
                    notified += 1;
                } else {
                    debug!(tier = %summary.tier, "notifications disabled; skipping alert");
                }
            }
        }
    }
    debug!(notified, "effects applied");
    Ok(notified)
}

fn watch<W: Write>(
    store: &dyn Persistence,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    clock: Clock,
) -> anyhow::Result<()> {
    let interval = cfg.reminder_interval()?;
    info!(interval_secs = interval.as_secs(), "watching reminders");
    loop {
        match reminder_tick(store, cfg, renderer, clock) {
            Ok(alerts) => debug!(alerts, "reminder check done"),
            Err(err) => warn!(error = %format!("{err:#}"), "reminder check failed"),
        }
        thread::sleep(interval);
    }
}

/// One pass of the watch loop. A rejected check is shown as a toast
/// instead of ending the loop.
fn reminder_tick<W: Write>(
    store: &dyn Persistence,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    clock: Clock,
) -> anyhow::Result<usize> {
    let now = clock.now();
    let today = clock.today(now);
    let state = store.load()?;
    let transition = update_or_report(&state, Command::CheckReminders, now, today);
    apply_effects(store, cfg, renderer, &transition)
}

fn draft_from(task: &Task) -> TaskDraft {
    TaskDraft {
        title: task.title.clone(),
        body: task.body.clone(),
        priority: task.priority,
        category: task.category,
        due_date: task.due_date,
    }
}

fn apply_fields(
    mut draft: TaskDraft,
    fields: &TaskFields,
    today: NaiveDate,
) -> anyhow::Result<TaskDraft> {
    if let Some(raw) = fields.priority.as_deref() {
        draft.priority = raw.parse::<Priority>()?;
    }
    if let Some(raw) = fields.category.as_deref() {
        draft.category = raw.parse::<Category>()?;
    }
    if let Some(raw) = fields.due.as_deref() {
        draft.due_date = if raw.trim().is_empty() {
            None
        } else {
            Some(parse_day(raw, today)?)
        };
    }
    Ok(draft)
}

fn task_filter(args: &FilterArgs) -> anyhow::Result<TaskFilter> {
    Ok(TaskFilter::parse(
        args.status.as_deref(),
        args.priority.as_deref(),
        args.category.as_deref(),
    )?)
}
