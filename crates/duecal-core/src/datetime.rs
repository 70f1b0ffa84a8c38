use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::{
  CoreError,
  CoreResult
};

const TIMEZONE_CONFIG_FILE: &str =
  "duecal-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DUECAL_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DUECAL_TIME_CONFIG";

pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Timezone used to turn instants into calendar days.
///
/// Resolved once per process from `DUECAL_TIMEZONE`, then a
/// `duecal-time.toml` file, then UTC.
pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

#[must_use]
pub fn to_project_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[must_use]
pub fn today_in_project(
  now: DateTime<Utc>
) -> NaiveDate {
  to_project_date(now)
}

#[must_use]
pub fn format_day(
  day: NaiveDate
) -> String {
  day.format(DAY_FORMAT).to_string()
}

/// Whole days from `today` to `due`; negative when `due` is past.
#[must_use]
pub fn days_until(
  today: NaiveDate,
  due: NaiveDate
) -> i64 {
  due.signed_duration_since(today)
    .num_days()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> CoreResult<NaiveDate> {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .ok_or_else(|| {
    CoreError::invalid_date(
      format!("{year:04}-{month:02}"),
      "no such month"
    )
  })
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> CoreResult<NaiveDate> {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  first_day_of_month(year, month)?;
  Ok(add_days(
    first_day_of_month(
      next_year, next_month
    )?,
    -1
  ))
}

/// Sunday on or before `day`. Fails when that Sunday lies before the
/// earliest representable date.
pub fn start_of_week(
  day: NaiveDate
) -> CoreResult<NaiveDate> {
  let diff = day
    .weekday()
    .num_days_from_sunday()
    as i64;
  Duration::try_days(diff)
    .and_then(|delta| {
      day.checked_sub_signed(delta)
    })
    .ok_or_else(|| {
      CoreError::invalid_date(
        format_day(day),
        "week start is outside the \
         supported date range"
      )
    })
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  tracing::debug!(
    "no project timezone configured; \
     using UTC"
  );
  chrono_tz::UTC
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses a due-date expression into a calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 instants (taken in the project
/// timezone), `today`/`tomorrow`/`yesterday` and `+Nd`/`-Nd`/`+Nw`.
#[tracing::instrument(skip(today))]
pub fn parse_day(
  input: &str,
  today: NaiveDate
) -> CoreResult<NaiveDate> {
  let token = input.trim();
  if token.is_empty() {
    return Err(CoreError::invalid_date(
      input,
      "empty date"
    ));
  }

  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(days) =
    parse_relative_days(token)?
  {
    return Duration::try_days(days)
      .and_then(|delta| {
        today.checked_add_signed(delta)
      })
      .ok_or_else(|| {
        CoreError::invalid_date(
          input,
          "offset out of range"
        )
      });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, DAY_FORMAT
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(to_project_date(
      dt.with_timezone(&Utc)
    ));
  }

  Err(CoreError::invalid_date(
    input,
    "expected YYYY-MM-DD, an RFC 3339 \
     timestamp, today/tomorrow/\
     yesterday or +Nd/+Nw"
  ))
}

/// Strict `YYYY-MM-DD` parse used for stored data.
pub fn parse_iso_day(
  input: &str
) -> CoreResult<NaiveDate> {
  NaiveDate::parse_from_str(
    input.trim(),
    DAY_FORMAT
  )
  .map_err(|err| {
    CoreError::invalid_date(
      input,
      err.to_string()
    )
  })
}

fn parse_relative_days(
  token: &str
) -> CoreResult<Option<i64>> {
  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    CoreError::invalid_date(
      token,
      format!(
        "internal regex compile \
         failure: {e}"
      )
    )
  })?;

  let Some(caps) =
    rel_re.captures(token)
  else {
    return Ok(None);
  };

  let num: i64 = caps["num"]
    .parse()
    .map_err(|_| {
      CoreError::invalid_date(
        token,
        "relative amount too large"
      )
    })?;
  let days = match &caps["unit"] {
    | "w" => num.saturating_mul(7),
    | _ => num
  };

  Ok(Some(if &caps["sign"] == "-" {
    -days
  } else {
    days
  }))
}

/// Serde adapter for optional due dates. Blank strings and nulls read as
/// undated; dates are written as `YYYY-MM-DD`.
pub mod due_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::DAY_FORMAT;

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match date {
      | Some(value) => {
        serializer.serialize_str(
          &value
            .format(DAY_FORMAT)
            .to_string()
        )
      }
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let opt =
      Option::<String>::deserialize(
        deserializer
      )?;
    match opt.as_deref().map(str::trim) {
      | None | Some("") => Ok(None),
      | Some(raw) => {
        NaiveDate::parse_from_str(
          raw, DAY_FORMAT
        )
        .map(Some)
        .map_err(
          serde::de::Error::custom
        )
      }
    }
  }
}
