//! Date to pixel conversions.
//!
//! Month and quarter modes use flat 30 and 90 day units rather than calendar
//! lengths, so pixel positions are a linear function of elapsed time.

use chrono::{DateTime, Utc};

use super::{TimelineItem, ViewMode, ZoomLevel};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Pixels for one unit of `mode` at `zoom`.
pub fn unit_width(mode: ViewMode, zoom: ZoomLevel) -> f64 {
  let base = match mode {
    ViewMode::Days => 60.0,
    ViewMode::Weeks => 100.0,
    ViewMode::Months => 120.0,
    ViewMode::Quarters => 150.0,
  };
  base * zoom.value()
}

/// Days covered by one unit of `mode`.
pub fn days_per_unit(mode: ViewMode) -> f64 {
  match mode {
    ViewMode::Days => 1.0,
    ViewMode::Weeks => 7.0,
    ViewMode::Months => 30.0,
    ViewMode::Quarters => 90.0,
  }
}

/// Fraction of a unit covered by one day.
pub fn units_per_day(mode: ViewMode) -> f64 {
  1.0 / days_per_unit(mode)
}

/// Elapsed days from `from` to `to`, fractional and signed.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
  (to - from).num_milliseconds() as f64 / MS_PER_DAY
}

/// Pixels from pixel 0 for a number of days.
fn pixels_for_days(days: f64, mode: ViewMode, zoom: ZoomLevel) -> f64 {
  days * units_per_day(mode) * unit_width(mode, zoom)
}

/// Horizontal offset of `date`. Dates before `range_start` are negative.
pub fn position(date: DateTime<Utc>, range_start: DateTime<Utc>, mode: ViewMode, zoom: ZoomLevel) -> f64 {
  pixels_for_days(days_between(range_start, date), mode, zoom)
}

/// Bar width for an item, never below `min_width`.
pub fn width(item: &TimelineItem, mode: ViewMode, zoom: ZoomLevel, min_width: f64) -> f64 {
  let days = item.duration_days() as f64;
  pixels_for_days(days, mode, zoom).max(min_width)
}

/// Offset of the "today" marker, or `None` when the marker is switched off.
pub fn today_marker_position(
  range_start: DateTime<Utc>,
  mode: ViewMode,
  zoom: ZoomLevel,
  now: DateTime<Utc>,
  show_today: bool,
) -> Option<f64> {
  show_today.then(|| position(now, range_start, mode, zoom))
}
