//! Urgency classification of due dates relative to a given day.
//!
//! Everything here works at day granularity and takes `today` as a
//! parameter; nothing reads the wall clock.

use std::fmt;

use chrono::NaiveDate;

use crate::datetime::{
  days_until,
  format_day,
  parse_day
};
use crate::error::CoreResult;

/// Urgency bucket, ordered from most to least urgent.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub enum Tier {
  Overdue,
  DueTomorrow,
  DueWithin3Days,
  DueWithin1Week,
  DueWithin2Weeks,
  None
}

impl Tier {
  pub const REMINDER_TIERS: [Tier; 5] = [
    Tier::Overdue,
    Tier::DueTomorrow,
    Tier::DueWithin3Days,
    Tier::DueWithin1Week,
    Tier::DueWithin2Weeks
  ];

  /// Fixed sort rank, 1 being most urgent. `None` has no rank.
  #[must_use]
  pub fn rank(self) -> Option<u8> {
    match self {
      | Tier::Overdue => Some(1),
      | Tier::DueTomorrow => Some(2),
      | Tier::DueWithin3Days => Some(3),
      | Tier::DueWithin1Week => Some(4),
      | Tier::DueWithin2Weeks => Some(5),
      | Tier::None => None
    }
  }

  #[must_use]
  pub fn from_days(
    days_diff: i64
  ) -> Self {
    match days_diff {
      | d if d < 0 => Tier::Overdue,
      | 1 => Tier::DueTomorrow,
      // Due today shares the 3-day bucket.
      | 0 | 2..=3 => {
        Tier::DueWithin3Days
      }
      | 4..=7 => Tier::DueWithin1Week,
      | 8..=14 => Tier::DueWithin2Weeks,
      | _ => Tier::None
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Tier::Overdue => "overdue",
      | Tier::DueTomorrow => {
        "due_tomorrow"
      }
      | Tier::DueWithin3Days => {
        "due_within_3_days"
      }
      | Tier::DueWithin1Week => {
        "due_within_1_week"
      }
      | Tier::DueWithin2Weeks => {
        "due_within_2_weeks"
      }
      | Tier::None => "none"
    }
  }
}

impl fmt::Display for Tier {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of classifying one due date against one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub tier:      Tier,
  /// `None` when the task has no due date.
  pub days_diff: Option<i64>
}

impl Classification {
  pub const UNDATED: Classification =
    Classification {
      tier:      Tier::None,
      days_diff: None
    };

  pub fn is_overdue(&self) -> bool {
    self.days_diff.is_some_and(|d| d < 0)
  }

  pub fn is_due_today(&self) -> bool {
    self.days_diff == Some(0)
  }

  pub fn is_due_tomorrow(&self) -> bool {
    self.days_diff == Some(1)
  }

  pub fn is_due_this_week(
    &self
  ) -> bool {
    self
      .days_diff
      .is_some_and(|d| (0..=7).contains(&d))
  }

  /// Human message for reminder lists; `None` for tier `None`.
  pub fn message(
    &self
  ) -> Option<String> {
    let days = self.days_diff?;
    let text = match self.tier {
      | Tier::Overdue => {
        let late = days.unsigned_abs();
        format!(
          "{late} {} overdue",
          plural(late, "day", "days")
        )
      }
      | Tier::DueTomorrow => {
        "Due tomorrow".to_string()
      }
      | Tier::DueWithin3Days
        if days == 0 =>
      {
        "Due today".to_string()
      }
      | Tier::DueWithin3Days
      | Tier::DueWithin1Week
      | Tier::DueWithin2Weeks => {
        format!("Due in {days} days")
      }
      | Tier::None => return None
    };
    Some(text)
  }

  /// Short badge label for reminder lists; `None` for tier `None`.
  pub fn badge(&self) -> Option<String> {
    let days = self.days_diff?;
    let badge = match self.tier {
      | Tier::Overdue => {
        "OVERDUE".to_string()
      }
      | Tier::DueTomorrow => {
        "TOMORROW".to_string()
      }
      | Tier::DueWithin3Days
        if days == 0 =>
      {
        "TODAY".to_string()
      }
      | Tier::DueWithin3Days
      | Tier::DueWithin1Week
      | Tier::DueWithin2Weeks => {
        format!("{days} DAYS")
      }
      | Tier::None => return None
    };
    Some(badge)
  }
}

#[must_use]
pub fn classify(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> Classification {
  let Some(due) = due else {
    return Classification::UNDATED;
  };
  let days_diff = days_until(today, due);
  let tier = Tier::from_days(days_diff);
  tracing::trace!(
    %today,
    %due,
    days_diff,
    %tier,
    "classified due date"
  );
  Classification {
    tier,
    days_diff: Some(days_diff)
  }
}

/// Classifies textual input, failing on malformed dates instead of
/// treating them as undated. A blank `due` is undated.
pub fn classify_str(
  today: &str,
  due: Option<&str>
) -> CoreResult<Classification> {
  let today = crate::datetime::parse_iso_day(today)?;
  let due = match due.map(str::trim) {
    | None | Some("") => None,
    | Some(raw) => {
      Some(parse_day(raw, today)?)
    }
  };
  Ok(classify(today, due))
}

pub fn is_overdue(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> bool {
  classify(today, due).is_overdue()
}

pub fn is_due_today(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> bool {
  classify(today, due).is_due_today()
}

pub fn is_due_tomorrow(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> bool {
  classify(today, due)
    .is_due_tomorrow()
}

pub fn is_due_this_week(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> bool {
  classify(today, due)
    .is_due_this_week()
}

/// "Today", "Tomorrow", or the ISO date.
pub fn due_label(
  today: NaiveDate,
  due: Option<NaiveDate>
) -> String {
  match due {
    | None => "No due date".to_string(),
    | Some(d) if d == today => {
      "Today".to_string()
    }
    | Some(d)
      if days_until(today, d) == 1 =>
    {
      "Tomorrow".to_string()
    }
    | Some(d) => format_day(d)
  }
}

fn plural<'a>(
  n: u64,
  one: &'a str,
  many: &'a str
) -> &'a str {
  if n == 1 { one } else { many }
}
