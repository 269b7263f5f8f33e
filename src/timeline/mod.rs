//! Timeline coordinate mapping.
//!
//! Converts date-bounded items into horizontal pixel bars for a view
//! granularity and zoom, and produces axis ticks. Every function here is pure:
//! the current time is passed in, never read.

mod scale;
mod ticks;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::Task;

pub use scale::{days_between, position, today_marker_position, unit_width, units_per_day, width};
pub use ticks::{generate_ticks, week_number, Tick};

/// Display granularity of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Days,
  #[default]
  Weeks,
  Months,
  Quarters,
}

impl ViewMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ViewMode::Days => "days",
      ViewMode::Weeks => "weeks",
      ViewMode::Months => "months",
      ViewMode::Quarters => "quarters",
    }
  }
}

impl fmt::Display for ViewMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ViewMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "days" => Ok(ViewMode::Days),
      "weeks" => Ok(ViewMode::Weeks),
      "months" => Ok(ViewMode::Months),
      "quarters" => Ok(ViewMode::Quarters),
      other => Err(format!(
        "unknown view mode '{}' (expected days, weeks, months or quarters)",
        other
      )),
    }
  }
}

/// Zoom factor, clamped to `[0.5, 3]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ZoomLevel(f64);

impl ZoomLevel {
  pub const MIN: f64 = 0.5;
  pub const MAX: f64 = 3.0;

  pub fn new(value: f64) -> Self {
    if value.is_finite() {
      ZoomLevel(value.clamp(Self::MIN, Self::MAX))
    } else {
      ZoomLevel::default()
    }
  }

  pub fn value(&self) -> f64 {
    self.0
  }
}

impl Default for ZoomLevel {
  fn default() -> Self {
    ZoomLevel(1.0)
  }
}

/// Something drawn as a bar on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem {
  pub id: String,
  pub label: String,
  pub start: DateTime<Utc>,
  /// `None` for open-ended items
  pub end: Option<DateTime<Utc>>,
  /// Fallback length for open-ended items
  pub estimated_days: Option<u32>,
  pub status: String,
  pub priority: String,
}

impl TimelineItem {
  pub fn new(id: impl Into<String>, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
    let id = id.into();
    Self {
      label: id.clone(),
      id,
      start,
      end,
      estimated_days: None,
      status: String::new(),
      priority: String::new(),
    }
  }

  /// Longest span an estimate may stretch an open-ended bar, about a century.
  pub const MAX_ESTIMATED_DAYS: u32 = 36_525;

  /// Bar for a task. Starts at the start date, or the creation day when the
  /// task has none. Tasks without a due date use their estimate, counted as
  /// eight-hour days.
  pub fn from_task(task: &Task) -> Self {
    let start = task
      .start_date
      .map(midnight)
      .unwrap_or_else(|| midnight(task.created_at.date_naive()));
    let estimated_days = task
      .estimated_hours
      .filter(|hours| hours.is_finite() && *hours > 0.0)
      .map(|hours| (hours / 8.0).ceil().min(f64::from(TimelineItem::MAX_ESTIMATED_DAYS)) as u32);
    Self {
      id: task.id.clone(),
      label: task.title.clone(),
      start,
      end: task.due_date.map(midnight),
      estimated_days,
      status: task.status.as_str().to_string(),
      priority: task.priority.as_str().to_string(),
    }
  }

  /// Whole days the bar spans, at least one.
  ///
  /// Partial days round up. An inverted range counts as one day.
  pub fn duration_days(&self) -> i64 {
    let days = match self.end {
      Some(end) => {
        let ms = (end - self.start).num_milliseconds();
        (ms as f64 / 86_400_000.0).ceil() as i64
      }
      None => i64::from(self.estimated_days.unwrap_or(0)),
    };
    days.max(1)
  }

  /// Effective end used for layout, saturating at the latest representable
  /// instant.
  pub fn effective_end(&self) -> DateTime<Utc> {
    saturating_add(self.start, Duration::try_days(self.duration_days()).unwrap_or(Duration::MAX))
  }
}

/// Visible window and scale of a timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConfig {
  pub mode: ViewMode,
  pub zoom: ZoomLevel,
  pub range_start: DateTime<Utc>,
  pub range_end: DateTime<Utc>,
}

impl ViewConfig {
  /// Build a view. A range that does not end after it starts is widened to
  /// one unit.
  pub fn new(
    mode: ViewMode,
    zoom: ZoomLevel,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
  ) -> Self {
    let range_end = if range_end > range_start {
      range_end
    } else {
      saturating_add(range_start, unit(mode))
    };
    Self {
      mode,
      zoom,
      range_start,
      range_end,
    }
  }

  /// Smallest view covering every item, padded by one unit on each side.
  pub fn fit(items: &[TimelineItem], mode: ViewMode, zoom: ZoomLevel) -> Option<Self> {
    let start = items.iter().map(|item| item.start).min()?;
    let end = items.iter().map(TimelineItem::effective_end).max()?;
    Some(Self::new(
      mode,
      zoom,
      saturating_add(start, -unit(mode)),
      saturating_add(end, unit(mode)),
    ))
  }

  pub fn position(&self, date: DateTime<Utc>) -> f64 {
    position(date, self.range_start, self.mode, self.zoom)
  }

  /// Pixel width of the whole visible range.
  pub fn total_width(&self) -> f64 {
    self.position(self.range_end)
  }

  pub fn ticks(&self) -> Vec<Tick> {
    generate_ticks(self.range_start, self.range_end, self.mode, self.zoom)
  }
}

/// `date + delta`, clamped to the representable range instead of panicking.
pub fn saturating_add(date: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
  date.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
    DateTime::<Utc>::MIN_UTC
  } else {
    DateTime::<Utc>::MAX_UTC
  })
}

/// Start of `date` in UTC.
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(chrono::NaiveTime::default()).and_utc()
}

fn unit(mode: ViewMode) -> Duration {
  match mode {
    ViewMode::Days => Duration::days(1),
    ViewMode::Weeks => Duration::days(7),
    ViewMode::Months => Duration::days(30),
    ViewMode::Quarters => Duration::days(90),
  }
}

/// A positioned bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
  pub id: String,
  pub label: String,
  pub left: f64,
  pub width: f64,
  /// One row per item, in input order
  pub row: usize,
  pub status: String,
  pub priority: String,
}

/// Lay out `items` as bars. Positions outside the view are left for the
/// caller to clip.
pub fn layout(items: &[TimelineItem], config: &ViewConfig, min_width: f64) -> Vec<Bar> {
  items
    .iter()
    .enumerate()
    .map(|(row, item)| Bar {
      id: item.id.clone(),
      label: item.label.clone(),
      left: config.position(item.start),
      width: width(item, config.mode, config.zoom, min_width),
      row,
      status: item.status.clone(),
      priority: item.priority.clone(),
    })
    .collect()
}
