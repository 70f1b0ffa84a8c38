use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::book::Stats;
use crate::calendar::{CalendarCell, MonthGrid, WEEKDAY_LABELS};
use crate::classify::{classify, due_label};
use crate::config::Config;
use crate::datetime::format_day;
use crate::reminder::{Reminder, TierSummary};
use crate::task::{Priority, Task};
use crate::update::ToastLevel;

const CELL_WIDTH: usize = 5;

/// Text presentation of core results.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl Renderer<io::Stdout> {
    pub fn stdout(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color_enabled()? && io::stdout().is_terminal();
        Ok(Self::new(io::stdout(), color))
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(self.out, "No tasks.")?;
            return Ok(());
        }

        let headers = ["ID", "Due", "Pri", "Category", "Title", "Status"]
            .map(str::to_string)
            .to_vec();

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let c = classify(today, task.due_date);
            let due = task.due_date.map(format_day).unwrap_or_default();
            let due = if task.is_pending() && c.is_overdue() {
                self.paint(&due, "31")
            } else if task.is_pending() && c.is_due_today() {
                self.paint(&due, "33")
            } else {
                due
            };
            let status = if task.completed { "done" } else { "pending" };

            rows.push(vec![
                self.paint(&task.id.to_string(), "33"),
                due,
                self.paint_priority(task.priority),
                task.category.to_string(),
                task.title.clone(),
                status.to_string(),
            ]);
        }

        write_table(&mut self.out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task, today: NaiveDate) -> anyhow::Result<()> {
        writeln!(self.out, "id        {}", task.id)?;
        writeln!(self.out, "title     {}", task.title)?;
        writeln!(self.out, "body      {}", task.body)?;
        writeln!(self.out, "priority  {}", task.priority)?;
        writeln!(self.out, "category  {}", task.category)?;
        writeln!(self.out, "due       {}", due_label(today, task.due_date))?;
        writeln!(
            self.out,
            "status    {}",
            if task.completed { "completed" } else { "pending" }
        )?;
        writeln!(self.out, "created   {}", task.created_at.format("%Y-%m-%d %H:%M"))?;
        if let Some(updated) = task.updated_at {
            writeln!(self.out, "updated   {}", updated.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }

    /// Month grid followed by an agenda of the placed tasks.
    #[tracing::instrument(skip(self, grid), fields(year = grid.year, month = grid.month))]
    pub fn print_month(&mut self, grid: &MonthGrid<'_>) -> anyhow::Result<()> {
        writeln!(self.out, "{}", grid.title())?;
        let labels = WEEKDAY_LABELS
            .iter()
            .map(|label| format!("{label:<CELL_WIDTH$}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "{}", labels.trim_end())?;

        for week in grid.weeks() {
            let line = week
                .iter()
                .map(|cell| self.format_cell(cell))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.out, "{}", line.trim_end())?;
        }

        let placed: Vec<&CalendarCell<'_>> =
            grid.cells.iter().filter(|cell| !cell.tasks.is_empty()).collect();
        if placed.is_empty() {
            return Ok(());
        }

        writeln!(self.out)?;
        for cell in placed {
            for entry in &cell.tasks {
                let mut line = format!(
                    "{}  #{} [{}] {}",
                    format_day(cell.date),
                    entry.task.id,
                    entry.task.priority,
                    entry.task.title
                );
                if entry.completed {
                    line.push_str("  (done)");
                } else if entry.overdue {
                    line = self.paint(&format!("{line}  (overdue)"), "31");
                }
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }

    pub fn print_reminders(&mut self, reminders: &[Reminder<'_>]) -> anyhow::Result<()> {
        if reminders.is_empty() {
            writeln!(self.out, "No upcoming reminders.")?;
            return Ok(());
        }
        for reminder in reminders {
            let badge = format!("[{}]", reminder.badge);
            let badge = match reminder.rank {
                1 => self.paint(&badge, "31"),
                2 | 3 => self.paint(&badge, "33"),
                _ => badge,
            };
            let due = reminder.task.due_date.map(format_day).unwrap_or_default();
            writeln!(
                self.out,
                "{badge} #{} {}: {} (due {due})",
                reminder.task.id, reminder.task.title, reminder.message
            )?;
        }
        Ok(())
    }

    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        writeln!(self.out, "total      {}", stats.total)?;
        writeln!(self.out, "completed  {}", stats.completed)?;
        writeln!(self.out, "pending    {}", stats.pending)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(self.out, "overdue    {overdue}")?;
        Ok(())
    }

    pub fn print_toast(&mut self, level: ToastLevel, message: &str) -> anyhow::Result<()> {
        let prefix = match level {
            ToastLevel::Info => "info:".to_string(),
            ToastLevel::Success => self.paint("ok:", "32"),
            ToastLevel::Error => self.paint("error:", "31"),
        };
        writeln!(self.out, "{prefix} {message}")?;
        Ok(())
    }

    pub fn print_notification(&mut self, summary: &TierSummary) -> anyhow::Result<()> {
        let title = self.paint(&summary.title, "1");
        writeln!(self.out, "{title}: {}", summary.body)?;
        Ok(())
    }

    fn format_cell(&self, cell: &CalendarCell<'_>) -> String {
        let day = chrono::Datelike::day(&cell.date);
        let number = if cell.is_today {
            format!("[{day:>2}]")
        } else if cell.is_current_month {
            format!(" {day:>2} ")
        } else {
            format!("({day:>2})")
        };
        let marker = if cell.tasks.iter().any(|e| e.overdue) {
            '!'
        } else if !cell.tasks.is_empty() {
            '*'
        } else {
            ' '
        };
        let text = format!("{number}{marker}");
        if cell.is_today {
            self.paint(&text, "7")
        } else if !cell.is_current_month {
            self.paint(&text, "2")
        } else {
            text
        }
    }

    fn paint_priority(&self, priority: Priority) -> String {
        match priority {
            Priority::High => self.paint(priority.as_str(), "31"),
            Priority::Medium => self.paint(priority.as_str(), "33"),
            Priority::Low => priority.as_str().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::calendar::build_grid;
    use crate::reminder::build_reminders;
    use crate::task::TaskDraft;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> Vec<Task> {
        let now = Utc
            .with_ymd_and_hms(2024, 6, 1, 8, 0, 0)
            .single()
            .expect("valid now");
        vec![
            Task::from_draft(
                0,
                TaskDraft::new("Pay rent", "June").with_due(Some(day(2024, 6, 9))),
                now,
            ),
            Task::from_draft(
                1,
                TaskDraft::new("Gym", "legs")
                    .with_priority(Priority::High)
                    .with_due(Some(day(2024, 6, 11))),
                now,
            ),
        ]
    }

    fn rendered(f: impl FnOnce(&mut Renderer<Vec<u8>>)) -> String {
        let mut renderer = Renderer::new(Vec::new(), false);
        f(&mut renderer);
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    #[test]
    fn month_view_marks_today_padding_and_tasks() {
        let tasks = sample();
        let today = day(2024, 6, 10);
        let grid = build_grid(2024, 6, &tasks, today).expect("grid");
        let text = rendered(|r| r.print_month(&grid).expect("print"));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "June 2024");
        assert!(lines[1].starts_with("Sun"));
        assert!(lines[2].starts_with("(26)"));
        assert!(text.contains("[10]"));
        assert!(text.contains("  9 !"));
        assert!(text.contains(" 11 *"));
        assert!(text.contains("2024-06-09  #0 [low] Pay rent  (overdue)"));
    }

    #[test]
    fn reminders_and_stats_render_plainly() {
        let tasks = sample();
        let today = day(2024, 6, 10);
        let reminders = build_reminders(&tasks, today);
        let text = rendered(|r| r.print_reminders(&reminders).expect("print"));
        assert!(text.contains("[OVERDUE] #0 Pay rent: 1 day overdue (due 2024-06-09)"));
        assert!(text.contains("[TOMORROW] #1 Gym: Due tomorrow"));

        let stats = Stats {
            total: 2,
            completed: 0,
            pending: 2,
            overdue: 1,
        };
        let text = rendered(|r| r.print_stats(&stats).expect("print"));
        assert!(text.contains("overdue    1"));
    }

    #[test]
    fn table_aligns_columns() {
        let tasks = sample();
        let refs: Vec<&Task> = tasks.iter().collect();
        let text = rendered(|r| r.print_task_table(&refs, day(2024, 6, 10)).expect("print"));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID Due"));
        assert_eq!(lines.len(), 4);
        assert!(lines[3].contains("high"));
    }

    #[test]
    fn strip_ansi_removes_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
