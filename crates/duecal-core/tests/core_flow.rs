use chrono::{NaiveDate, TimeZone, Utc};
use duecal_core::calendar::build_grid;
use duecal_core::classify::Tier;
use duecal_core::datastore::{JsonFileStore, Persistence};
use duecal_core::filter::TaskFilter;
use duecal_core::reminder::build_reminders;
use duecal_core::task::{Priority, TaskDraft};
use duecal_core::update::{AppState, Command, Effect, update};
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn tasks_survive_reload_and_drive_views() {
    let temp = tempdir().expect("tempdir");
    let store = JsonFileStore::open(temp.path()).expect("open datastore");
    let now = Utc
        .with_ymd_and_hms(2024, 6, 10, 8, 30, 0)
        .single()
        .expect("valid now");
    let today = day(2024, 6, 10);

    let drafts = [
        TaskDraft::new("Pay rent", "June").with_due(Some(day(2024, 6, 9))),
        TaskDraft::new("Dentist", "Checkup")
            .with_due(Some(day(2024, 6, 11)))
            .with_priority(Priority::High),
        TaskDraft::new("Renew passport", "Forms").with_due(Some(day(2024, 6, 24))),
    ];
    let mut state = AppState::default();
    for draft in drafts {
        let transition = update(&state, Command::Add(draft), now, today).expect("add");
        assert!(transition.effects.contains(&Effect::Persist));
        store.save(&transition.state).expect("save");
        state = transition.state;
    }

    let state = store.load().expect("reload");
    assert_eq!(state.book.len(), 3);
    assert_eq!(state.book.next_id(), 3);

    let reminders = build_reminders(state.book.tasks(), today);
    let tiers: Vec<Tier> = reminders.iter().map(|r| r.tier).collect();
    assert_eq!(tiers, vec![Tier::Overdue, Tier::DueTomorrow]);
    assert_eq!(reminders[0].message, "1 day overdue");

    let grid = build_grid(2024, 6, state.book.tasks(), today).expect("grid");
    let passport = grid.cell(day(2024, 6, 24)).expect("cell in grid");
    assert!(passport.is_current_month);
    assert_eq!(passport.tasks.len(), 1);
    let rent = grid.cell(day(2024, 6, 9)).expect("cell in grid");
    assert!(rent.tasks[0].overdue);
    assert!(grid.cell(today).expect("today").is_today);
    assert!(!grid.cells[0].is_current_month);

    let high = TaskFilter::parse(Some("pending"), Some("high"), None).expect("filter");
    let matched = high.apply(state.book.tasks());
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].title, "Dentist");
}

#[test]
fn reminder_gate_persists_across_sessions() {
    let temp = tempdir().expect("tempdir");
    let store = JsonFileStore::open(temp.path()).expect("open datastore");
    let now = Utc
        .with_ymd_and_hms(2024, 6, 10, 8, 30, 0)
        .single()
        .expect("valid now");
    let today = day(2024, 6, 10);

    let added = update(
        &AppState::default(),
        Command::Add(TaskDraft::new("late", "x").with_due(Some(day(2024, 6, 1)))),
        now,
        today,
    )
    .expect("add");
    let checked =
        update(&added.state, Command::CheckReminders, now, today).expect("check");
    assert!(checked.effects.iter().any(|e| matches!(e, Effect::Notify(_))));
    store.save(&checked.state).expect("save");

    let reloaded = store.load().expect("load");
    let again = update(&reloaded, Command::CheckReminders, now, today).expect("check");
    assert!(again.effects.is_empty());

    let next_day = update(&reloaded, Command::CheckReminders, now, day(2024, 6, 11))
        .expect("check");
    assert!(!next_day.effects.is_empty());
}
