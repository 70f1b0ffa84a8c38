use chrono::NaiveDate;

use crate::classify::{
  Tier,
  classify
};
use crate::task::Task;

/// A pending, dated task paired with its urgency. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder<'a> {
  pub task:      &'a Task,
  pub tier:      Tier,
  pub rank:      u8,
  pub days_diff: i64,
  pub message:   String,
  pub badge:     String
}

/// Builds the reminder list, most urgent first.
///
/// Completed and undated tasks are skipped, as are tasks beyond the
/// two-week horizon. Equal ranks keep input order.
#[tracing::instrument(skip(tasks))]
pub fn build_reminders<'a, I>(
  tasks: I,
  today: NaiveDate
) -> Vec<Reminder<'a>>
where
  I: IntoIterator<Item = &'a Task>
{
  let mut reminders: Vec<Reminder<'a>> =
    tasks
      .into_iter()
      .filter(|task| !task.completed)
      .filter_map(|task| {
        let c = classify(
          today,
          task.due_date
        );
        let rank = c.tier.rank()?;
        Some(Reminder {
          task,
          tier: c.tier,
          rank,
          days_diff: c.days_diff?,
          message: c.message()?,
          badge: c.badge()?
        })
      })
      .collect();

  reminders.sort_by_key(|r| r.rank);

  tracing::debug!(
    count = reminders.len(),
    "built reminders"
  );
  reminders
}

/// Aggregated alert for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSummary {
  pub tier:  Tier,
  pub count: usize,
  pub title: String,
  pub body:  String
}

/// Counts reminders per tier, returning one entry per non-empty tier in
/// rank order.
pub fn summarize(
  reminders: &[Reminder<'_>]
) -> Vec<TierSummary> {
  Tier::REMINDER_TIERS
    .into_iter()
    .filter_map(|tier| {
      let count = reminders
        .iter()
        .filter(|r| r.tier == tier)
        .count();
      (count > 0).then(|| TierSummary {
        tier,
        count,
        title: alert_title(tier)
          .to_string(),
        body: alert_body(tier, count)
      })
    })
    .collect()
}

fn alert_title(
  tier: Tier
) -> &'static str {
  match tier {
    | Tier::Overdue => "Overdue tasks",
    | Tier::DueTomorrow => {
      "Due tomorrow"
    }
    | Tier::DueWithin3Days => {
      "Due soon"
    }
    | Tier::DueWithin1Week => {
      "Due this week"
    }
    | Tier::DueWithin2Weeks => {
      "Coming up"
    }
    | Tier::None => "Reminders"
  }
}

fn alert_body(
  tier: Tier,
  count: usize
) -> String {
  let tasks = if count == 1 {
    "task"
  } else {
    "tasks"
  };
  match tier {
    | Tier::Overdue => {
      format!("{count} overdue {tasks}")
    }
    | Tier::DueTomorrow => {
      format!(
        "{count} {tasks} due tomorrow"
      )
    }
    | Tier::DueWithin3Days => {
      format!(
        "{count} {tasks} due within 3 \
         days"
      )
    }
    | Tier::DueWithin1Week => {
      format!(
        "{count} {tasks} due within a \
         week"
      )
    }
    | Tier::DueWithin2Weeks => {
      format!(
        "{count} {tasks} due within 2 \
         weeks"
      )
    }
    | Tier::None => {
      format!("{count} {tasks}")
    }
  }
}

/// Once-per-day gate for notification alerts, persisted by the caller.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq
)]
pub struct ReminderGate {
  pub last_checked: Option<NaiveDate>
}

impl ReminderGate {
  pub fn notifications_due(
    &self,
    today: NaiveDate
  ) -> bool {
    self
      .last_checked
      .is_none_or(|last| last != today)
  }

  pub fn mark_checked(
    &mut self,
    today: NaiveDate
  ) {
    self.last_checked = Some(today);
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCheck {
  pub alerts: Vec<TierSummary>,
  pub gate:   ReminderGate
}

/// Runs the periodic reminder check. Alerts are produced at most once
/// per calendar day; later calls on the same day return none.
#[tracing::instrument(skip(tasks))]
pub fn check_reminders<'a, I>(
  tasks: I,
  today: NaiveDate,
  gate: ReminderGate
) -> ReminderCheck
where
  I: IntoIterator<Item = &'a Task>
{
  if !gate.notifications_due(today) {
    tracing::debug!(
      ?gate.last_checked,
      "reminders already checked today"
    );
    return ReminderCheck {
      alerts: Vec::new(),
      gate
    };
  }

  let reminders =
    build_reminders(tasks, today);
  let alerts = summarize(&reminders);
  let mut gate = gate;
  gate.mark_checked(today);

  tracing::info!(
    tiers = alerts.len(),
    reminders = reminders.len(),
    "reminder check produced alerts"
  );
  ReminderCheck {
    alerts,
    gate
  }
}
