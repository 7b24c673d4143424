//! Time control for filtering transactions by date range

use chrono::{Datelike, NaiveDate, Utc};
use fintrack_config::TimeRange;

use crate::date::{from_day, END_OF_DAY};
use crate::models::Transaction;

/// Date window used by listings and breakdowns
#[derive(Debug, Clone, PartialEq)]
pub struct TimeContext {
    /// Current time range
    pub range: TimeRange,
    /// Custom start serial (when range is Custom)
    pub custom_start: Option<f64>,
    /// Custom end serial (when range is Custom)
    pub custom_end: Option<f64>,
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(TimeRange::All)
    }
}

impl TimeContext {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            custom_start: None,
            custom_end: None,
        }
    }

    /// Custom window; either bound may be open
    pub fn custom(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            range: TimeRange::Custom,
            custom_start: start,
            custom_end: end,
        }
    }

    /// Serial bounds of the window relative to `today`
    pub fn bounds_at(&self, today: NaiveDate) -> (Option<f64>, Option<f64>) {
        let (start, end) = match self.range {
            TimeRange::Month => {
                let start = today.with_day(1);
                let end = first_of_next_month(today.year(), today.month()).and_then(|d| d.pred_opt());
                (start, end)
            }
            TimeRange::Quarter => {
                let quarter_start = (today.month0() / 3) * 3 + 1;
                let start = NaiveDate::from_ymd_opt(today.year(), quarter_start, 1);
                let end = first_of_next_month(today.year(), quarter_start + 2).and_then(|d| d.pred_opt());
                (start, end)
            }
            TimeRange::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1),
                NaiveDate::from_ymd_opt(today.year(), 12, 31),
            ),
            TimeRange::All => return (None, None),
            TimeRange::Custom => return (self.custom_start, self.custom_end),
        };
        (start.map(from_day), end.map(|d| from_day(d) + END_OF_DAY))
    }

    /// Window resolved against `today`
    pub fn window_at(&self, today: NaiveDate) -> TimeWindow {
        let (start, end) = self.bounds_at(today);
        TimeWindow { start, end }
    }

    /// Window resolved against the current UTC day; read the clock once per
    /// listing and reuse the result for every row
    pub fn window(&self) -> TimeWindow {
        self.window_at(Utc::now().date_naive())
    }

    /// Human-readable description of the window
    pub fn description(&self) -> String {
        match self.range {
            TimeRange::Month => "Current Month".to_string(),
            TimeRange::Quarter => "Current Quarter".to_string(),
            TimeRange::Year => "Current Year".to_string(),
            TimeRange::All => "All Time".to_string(),
            TimeRange::Custom => {
                let fmt = |s: Option<f64>| crate::date::format_serial(s, "%Y-%m-%d");
                match (self.custom_start, self.custom_end) {
                    (None, None) => "Custom Range".to_string(),
                    (start, end) => format!("{} to {}", fmt(start), fmt(end)),
                }
            }
        }
    }
}

/// Fixed serial bounds, both inclusive; `None` leaves a side open
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeWindow {
    pub fn contains(&self, serial: f64) -> bool {
        self.start.map_or(true, |s| serial >= s) && self.end.map_or(true, |e| serial <= e)
    }
}

fn first_of_next_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month >= 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

/// Time filtering trait
pub trait TimeFilter {
    fn filter_by_time(&self, window: &TimeWindow) -> bool;
}

impl TimeFilter for Transaction {
    fn filter_by_time(&self, window: &TimeWindow) -> bool {
        match self.date {
            Some(serial) => window.contains(serial),
            // undated rows stay visible
            None => true,
        }
    }
}
