//! Inclusive calendar-day ranges.

use chrono::{Duration, Local, NaiveDate};

use crate::event::{Event, MAX_SPAN_DAYS};

/// An inclusive range of calendar days. `last` is never before `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DayRange {
    pub fn new(first: NaiveDate, last: NaiveDate) -> Self {
        DayRange {
            first,
            last: last.max(first),
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        DayRange::new(date, date)
    }

    /// Days an event occupies, from its start date through its end date.
    pub fn of(event: &Event) -> Self {
        DayRange::new(event.start_date(), event.last_date())
    }

    /// Every day of a calendar month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(DayRange::new(first, next_month.pred_opt()?))
    }

    /// Parse a range from optional `YYYY-MM-DD` bounds.
    /// - `from` defaults to today
    /// - `to` defaults to `from` + `default_days`
    pub fn from_args(from: Option<&str>, to: Option<&str>, default_days: i64) -> Result<Self, String> {
        let first = match from {
            Some(s) => parse_date(s)?,
            None => Local::now().date_naive(),
        };

        let last = match to {
            Some(s) => parse_date(s)?,
            None => first + Duration::days(default_days),
        };

        if last < first {
            return Err(format!("'{}' is before '{}'", last, first));
        }

        Ok(DayRange { first, last })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }

    /// Number of days past `first`; zero for a single day.
    pub fn span_days(&self) -> i64 {
        (self.last - self.first).num_days()
    }

    /// The same range, shortened to at most `max_days` past its first day.
    pub fn capped(self, max_days: i64) -> Self {
        if self.span_days() <= max_days {
            return self;
        }
        DayRange {
            first: self.first,
            last: self.first + Duration::days(max_days),
        }
    }

    /// Walk the range one day at a time.
    pub fn days(&self) -> Days {
        Days {
            next: Some(self.first),
            last: self.last,
        }
    }
}

/// Iterator over the days of a [`DayRange`].
pub struct Days {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|d| *d <= self.last)?;
        self.next = current.succ_opt();
        Some(current)
    }
}

/// Days an event is expanded across, limited to [`MAX_SPAN_DAYS`].
pub(crate) fn expansion_range(event: &Event) -> DayRange {
    let range = DayRange::of(event);
    if range.span_days() > MAX_SPAN_DAYS {
        tracing::warn!(
            event = %event.id,
            span_days = range.span_days(),
            max = MAX_SPAN_DAYS,
            "Event span exceeds limit, truncating day expansion"
        );
    }
    range.capped(MAX_SPAN_DAYS)
}

/// Parse YYYY-MM-DD
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}
