//! Axis tick generation.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use super::scale::position;
use super::{ViewMode, ZoomLevel};

/// One labelled mark on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
  pub date: DateTime<Utc>,
  pub position: f64,
  pub label: String,
}

/// Ticks from `range_start` through `range_end`, one per unit of `mode`.
///
/// Days and weeks step by 1 and 7 days; months and quarters step by 1 and 3
/// calendar months, each computed from `range_start` so short months do not
/// drift the day of month.
pub fn generate_ticks(
  range_start: DateTime<Utc>,
  range_end: DateTime<Utc>,
  mode: ViewMode,
  zoom: ZoomLevel,
) -> Vec<Tick> {
  let mut ticks = Vec::new();
  let mut step: u32 = 0;
  loop {
    let Some(current) = nth_step(range_start, mode, step) else {
      break;
    };
    if current > range_end {
      break;
    }
    ticks.push(Tick {
      date: current,
      position: position(current, range_start, mode, zoom),
      label: label(current, mode),
    });
    step += 1;
  }
  ticks
}

fn nth_step(start: DateTime<Utc>, mode: ViewMode, n: u32) -> Option<DateTime<Utc>> {
  match mode {
    ViewMode::Days => start.checked_add_signed(Duration::days(i64::from(n))),
    ViewMode::Weeks => start.checked_add_signed(Duration::days(7 * i64::from(n))),
    ViewMode::Months => start.checked_add_months(Months::new(n)),
    ViewMode::Quarters => start.checked_add_months(Months::new(n.checked_mul(3)?)),
  }
}

/// Axis label for a tick in `mode`.
pub fn label(date: DateTime<Utc>, mode: ViewMode) -> String {
  match mode {
    ViewMode::Days => date.format("%b %d").to_string(),
    ViewMode::Weeks => format!("Week {}", week_number(date.date_naive())),
    ViewMode::Months => date.format("%b %Y").to_string(),
    ViewMode::Quarters => format!("Q{} {}", date.month0() / 3 + 1, date.year()),
  }
}

/// Week of the year with weeks starting on Sunday and week 1 holding Jan 1.
///
/// `ceil((days since Jan 1 + weekday of Jan 1 + 1) / 7)`. This is not
/// ISO 8601: there is no week 0 and no carry-over from the previous year.
pub fn week_number(date: NaiveDate) -> u32 {
  let jan1_weekday = NaiveDate::from_yo_opt(date.year(), 1)
    .map(|jan1| jan1.weekday().num_days_from_sunday())
    .unwrap_or(0);
  (date.ordinal0() + jan1_weekday + 1).div_ceil(7)
}
