//! Calendar event types.
//!
//! An [`Event`] is a saved [`EventDraft`] plus the identifiers the remote store
//! and the identity provider attach to it. Whether an event has clock times is
//! carried by [`Schedule`], so an all-day event simply has no times to get wrong.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Accent color used when an event has none of its own.
pub const DEFAULT_COLOR: &str = "#007AFF";

/// Longest span (in days past the start date) an event may cover.
pub const MAX_SPAN_DAYS: i64 = 3660;

/// Remote-assigned event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity that owns an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When during its days an event happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    AllDay,
    Timed { start: NaiveTime, end: NaiveTime },
}

impl Schedule {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Schedule::AllDay)
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        match self {
            Schedule::AllDay => None,
            Schedule::Timed { start, .. } => Some(*start),
        }
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        match self {
            Schedule::AllDay => None,
            Schedule::Timed { end, .. } => Some(*end),
        }
    }
}

/// The editable part of an event, before the store has given it an id and owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub schedule: Schedule,
    pub tag: Option<String>,
    pub color: Option<String>,
}

impl EventDraft {
    pub fn all_day(title: impl Into<String>, start_date: NaiveDate) -> Self {
        EventDraft {
            title: title.into(),
            description: None,
            start_date,
            end_date: None,
            schedule: Schedule::AllDay,
            tag: None,
            color: None,
        }
    }

    pub fn timed(
        title: impl Into<String>,
        start_date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        EventDraft {
            schedule: Schedule::Timed { start, end },
            ..EventDraft::all_day(title, start_date)
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = non_blank(tag.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = non_blank(color.into());
        self
    }

    /// Last day the event occupies; a missing end date means the start date.
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn is_multi_day(&self) -> bool {
        self.last_date() > self.start_date
    }

    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    /// Check the ordering invariants a save must satisfy.
    pub fn validate(&self, max_span_days: i64) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let last = self.last_date();
        if last < self.start_date {
            return Err(ValidationError::EndBeforeStart {
                start: self.start_date.to_string(),
                end: last.to_string(),
            });
        }

        let days = (last - self.start_date).num_days();
        if days > max_span_days {
            return Err(ValidationError::SpanTooLong {
                days,
                max: max_span_days,
            });
        }

        // Multi-day timed events compare full instants: 23:00 on day one may end at 01:00 later
        if let Schedule::Timed { start, end } = self.schedule {
            if self.start_date.and_time(start) >= last.and_time(end) {
                return Err(ValidationError::EndTimeNotAfterStart {
                    start: start.format("%H:%M").to_string(),
                    end: end.format("%H:%M").to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A saved calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub owner: OwnerId,
    pub details: EventDraft,
}

impl Event {
    pub fn new(id: EventId, owner: OwnerId, details: EventDraft) -> Self {
        Event { id, owner, details }
    }

    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn start_date(&self) -> NaiveDate {
        self.details.start_date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.details.last_date()
    }

    pub fn schedule(&self) -> Schedule {
        self.details.schedule
    }

    pub fn color_or_default(&self) -> &str {
        self.details.color_or_default()
    }

    /// The editable part of the event, for edit workflows.
    pub fn draft(&self) -> EventDraft {
        self.details.clone()
    }

    /// Whether the event occupies `date`.
    ///
    /// Data written outside the store may have an end before its start; such
    /// an event is treated as occupying its start date only.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        let start = self.start_date();
        let last = self.last_date().max(start);
        start <= date && date <= last
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details.title)
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
