use std::collections::BTreeMap;

use chrono::{
  Datelike,
  Duration,
  NaiveDate
};

use crate::classify::is_overdue;
use crate::datetime::{
  add_days,
  first_day_of_month,
  start_of_week
};
use crate::error::{
  CoreError,
  CoreResult
};
use crate::task::Task;

pub const WEEKS_PER_GRID: usize = 6;
pub const DAYS_PER_WEEK: usize = 7;
pub const GRID_CELLS: usize =
  WEEKS_PER_GRID * DAYS_PER_WEEK;

pub const WEEKDAY_LABELS: [&str;
  DAYS_PER_WEEK] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

/// One task placed in a cell, with its styling flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry<'a> {
  pub task:      &'a Task,
  pub overdue:   bool,
  pub completed: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell<'a> {
  pub date:             NaiveDate,
  pub is_current_month: bool,
  pub is_today:         bool,
  pub tasks: Vec<CalendarEntry<'a>>
}

/// Six Sunday-first weeks covering a month, padded with adjacent days.
#[derive(Debug, Clone)]
pub struct MonthGrid<'a> {
  pub year:  i32,
  pub month: u32,
  pub cells: [CalendarCell<'a>; GRID_CELLS]
}

impl<'a> MonthGrid<'a> {
  /// "June 2024".
  pub fn title(&self) -> String {
    self.cells
      .iter()
      .find(|cell| cell.is_current_month)
      .map(|cell| {
        cell.date.format("%B %Y").to_string()
      })
      .unwrap_or_default()
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[CalendarCell<'a>]>
  {
    self.cells.chunks(DAYS_PER_WEEK)
  }

  pub fn cell(
    &self,
    date: NaiveDate
  ) -> Option<&CalendarCell<'a>> {
    let offset = date
      .signed_duration_since(
        self.cells[0].date
      )
      .num_days();
    usize::try_from(offset)
      .ok()
      .and_then(|idx| self.cells.get(idx))
  }

  pub fn first_date(&self) -> NaiveDate {
    self.cells[0].date
  }

  pub fn last_date(&self) -> NaiveDate {
    self.cells[GRID_CELLS - 1].date
  }

  /// Number of task placements across all cells.
  pub fn placed_tasks(&self) -> usize {
    self.cells
      .iter()
      .map(|cell| cell.tasks.len())
      .sum()
  }
}

/// Lays out `month` of `year` as a 42-cell grid and places every dated
/// task on the cell matching its due date.
///
/// `tasks` is expected to be already filtered; order within a cell
/// follows input order.
#[tracing::instrument(skip(tasks))]
pub fn build_grid<'a, I>(
  year: i32,
  month: u32,
  tasks: I,
  today: NaiveDate
) -> CoreResult<MonthGrid<'a>>
where
  I: IntoIterator<Item = &'a Task>
{
  let first =
    first_day_of_month(year, month)?;
  let grid_start = start_of_week(first)?;
  let grid_end = grid_start
    .checked_add_signed(Duration::days(
      GRID_CELLS as i64 - 1
    ))
    .ok_or_else(|| {
      CoreError::invalid_date(
        format!("{year:04}-{month:02}"),
        "month is at the edge of the \
         supported date range"
      )
    })?;

  let mut by_day: BTreeMap<
    NaiveDate,
    Vec<&'a Task>
  > = BTreeMap::new();
  for task in tasks {
    let Some(due) = task.due_date else {
      continue;
    };
    if due < grid_start || due > grid_end
    {
      continue;
    }
    by_day.entry(due).or_default().push(task);
  }

  let cells = std::array::from_fn(
    |offset| {
      let date = add_days(
        grid_start,
        offset as i64
      );
      let tasks = by_day
        .get(&date)
        .map(|day_tasks| {
          day_tasks
            .iter()
            .copied()
            .map(|task| CalendarEntry {
              task,
              overdue: !task.completed
                && is_overdue(
                  today,
                  task.due_date
                ),
              completed: task.completed
            })
            .collect()
        })
        .unwrap_or_default();
      CalendarCell {
        date,
        is_current_month: date.month()
          == month
          && date.year() == year,
        is_today: date == today,
        tasks
      }
    }
  );

  tracing::debug!(
    %grid_start,
    %grid_end,
    days_with_tasks = by_day.len(),
    "built month grid"
  );

  Ok(MonthGrid {
    year,
    month,
    cells
  })
}

/// Moves `(year, month)` by `step` months, wrapping across years.
pub fn shift_month(
  year: i32,
  month: u32,
  step: i32
) -> CoreResult<(i32, u32)> {
  first_day_of_month(year, month)?;
  let zero_based = i64::from(year) * 12
    + i64::from(month)
    - 1
    + i64::from(step);
  let new_year = zero_based.div_euclid(12);
  let new_month =
    zero_based.rem_euclid(12) as u32 + 1;
  let new_year = i32::try_from(new_year)
    .map_err(|_| {
      CoreError::invalid_date(
        format!("{year:04}-{month:02}"),
        "shifted past the supported \
         year range"
      )
    })?;
  first_day_of_month(
    new_year, new_month
  )?;
  Ok((new_year, new_month))
}

/// Parses `YYYY-MM`.
pub fn parse_month(
  input: &str
) -> CoreResult<(i32, u32)> {
  let trimmed = input.trim();
  let (y, m) = trimmed
    .split_once('-')
    .ok_or_else(|| {
      CoreError::invalid_date(
        input,
        "expected YYYY-MM"
      )
    })?;
  let year: i32 =
    y.parse().map_err(|_| {
      CoreError::invalid_date(
        input,
        "invalid year"
      )
    })?;
  let month: u32 =
    m.parse().map_err(|_| {
      CoreError::invalid_date(
        input,
        "invalid month"
      )
    })?;
  first_day_of_month(year, month)?;
  Ok((year, month))
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    TimeZone,
    Utc,
    Weekday
  };

  use super::*;
  use crate::task::TaskDraft;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn task_due(
    id: u64,
    due: Option<NaiveDate>
  ) -> Task {
    let now = Utc
      .with_ymd_and_hms(
        2024, 6, 1, 8, 0, 0
      )
      .single()
      .expect("valid now");
    Task::from_draft(
      id,
      TaskDraft::new(
        format!("task {id}"),
        "body"
      )
      .with_due(due),
      now
    )
  }

  #[test]
  fn grid_shape_holds_for_every_month() {
    let empty: Vec<Task> = vec![];
    for year in [1999, 2023, 2024, 2026] {
      for month in 1..=12 {
        let grid = build_grid(
          year,
          month,
          &empty,
          day(2024, 6, 10)
        )
        .expect("grid");
        assert_eq!(
          grid.cells.len(),
          GRID_CELLS
        );
        assert_eq!(
          grid.first_date().weekday(),
          Weekday::Sun
        );
        assert!(
          grid.first_date()
            <= day(year, month, 1)
        );
        for pair in grid.cells.windows(2) {
          assert_eq!(
            pair[1]
              .date
              .signed_duration_since(
                pair[0].date
              )
              .num_days(),
            1
          );
        }
        assert_eq!(grid.weeks().count(), 6);
      }
    }
  }

  #[test]
  fn june_2024_flags() {
    let today = day(2024, 6, 10);
    let empty: Vec<Task> = vec![];
    let grid =
      build_grid(2024, 6, &empty, today)
        .expect("grid");

    assert_eq!(grid.title(), "June 2024");
    assert_eq!(
      grid.first_date(),
      day(2024, 5, 26)
    );

    let june_10 = grid
      .cell(today)
      .expect("june 10 cell");
    assert!(june_10.is_today);
    assert!(june_10.is_current_month);

    for d in 1..=9 {
      let cell = grid
        .cell(day(2024, 6, d))
        .expect("june cell");
      assert!(cell.is_current_month);
      assert!(!cell.is_today);
    }

    for cell in &grid.cells[..6] {
      assert_eq!(cell.date.month(), 5);
      assert!(!cell.is_current_month);
    }
    assert_eq!(
      grid
        .cells
        .iter()
        .filter(|c| c.is_today)
        .count(),
      1
    );
  }

  #[test]
  fn tasks_land_on_exact_due_day_in_input_order()
  {
    let today = day(2024, 6, 10);
    let tasks = vec![
      task_due(0, Some(day(2024, 6, 24))),
      task_due(1, None),
      task_due(2, Some(day(2024, 6, 9))),
      task_due(3, Some(day(2024, 6, 24))),
      task_due(4, Some(day(2024, 8, 1)))
    ];
    let grid =
      build_grid(2024, 6, &tasks, today)
        .expect("grid");

    let cell = grid
      .cell(day(2024, 6, 24))
      .expect("cell");
    assert!(cell.is_current_month);
    let ids: Vec<u64> = cell
      .tasks
      .iter()
      .map(|e| e.task.id)
      .collect();
    assert_eq!(ids, vec![0, 3]);
    assert!(
      cell.tasks.iter().all(|e| !e.overdue)
    );

    let yesterday = grid
      .cell(day(2024, 6, 9))
      .expect("cell");
    assert_eq!(yesterday.tasks.len(), 1);
    assert!(yesterday.tasks[0].overdue);

    assert_eq!(grid.placed_tasks(), 3);
  }

  #[test]
  fn completed_tasks_are_never_styled_overdue()
  {
    let today = day(2024, 6, 10);
    let mut done =
      task_due(0, Some(day(2024, 6, 3)));
    done.completed = true;
    let tasks = vec![done];
    let grid =
      build_grid(2024, 6, &tasks, today)
        .expect("grid");
    let entry = &grid
      .cell(day(2024, 6, 3))
      .expect("cell")
      .tasks[0];
    assert!(entry.completed);
    assert!(!entry.overdue);
  }

  #[test]
  fn padding_days_still_show_their_tasks()
  {
    let today = day(2024, 6, 10);
    let tasks =
      vec![task_due(9, Some(day(2024, 7, 2)))];
    let grid =
      build_grid(2024, 6, &tasks, today)
        .expect("grid");
    let cell = grid
      .cell(day(2024, 7, 2))
      .expect("trailing cell");
    assert!(!cell.is_current_month);
    assert_eq!(cell.tasks.len(), 1);
  }

  #[test]
  fn rejects_invalid_months() {
    let today = day(2024, 6, 10);
    let empty: Vec<Task> = vec![];
    assert!(matches!(
      build_grid(2024, 0, &empty, today),
      Err(CoreError::InvalidDate { .. })
    ));
    assert!(
      build_grid(2024, 13, &empty, today)
        .is_err()
    );
  }

  #[test]
  fn months_at_the_date_range_edges_are_rejected()
  {
    let today = day(2024, 6, 10);
    let empty: Vec<Task> = vec![];
    // No Sunday exists before the first representable day.
    assert!(matches!(
      build_grid(
        NaiveDate::MIN.year(),
        1,
        &empty,
        today
      ),
      Err(CoreError::InvalidDate { .. })
    ));
    assert!(matches!(
      build_grid(
        NaiveDate::MAX.year(),
        12,
        &empty,
        today
      ),
      Err(CoreError::InvalidDate { .. })
    ));
  }

  #[test]
  fn month_navigation_wraps_years() {
    assert_eq!(
      shift_month(2024, 1, -1)
        .expect("prev"),
      (2023, 12)
    );
    assert_eq!(
      shift_month(2024, 12, 1)
        .expect("next"),
      (2025, 1)
    );
    assert_eq!(
      shift_month(2024, 6, -18)
        .expect("back"),
      (2022, 12)
    );
    assert_eq!(
      shift_month(2024, 6, 0)
        .expect("same"),
      (2024, 6)
    );
  }

  #[test]
  fn parses_year_month() {
    assert_eq!(
      parse_month("2024-06")
        .expect("month"),
      (2024, 6)
    );
    assert!(parse_month("2024-13").is_err());
    assert!(parse_month("june").is_err());
  }
}
