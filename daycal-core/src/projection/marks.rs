//! Per-day calendar markers for month views.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::event::{Event, EventId};
use crate::projection::days::{DayRange, expansion_range};

/// One event's presence on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayMarker {
    pub event_id: EventId,
    /// The day is the event's start date.
    pub is_range_start: bool,
    /// The day is the event's last date.
    pub is_range_end: bool,
    /// Event color, or the accent color when it has none.
    pub color: String,
}

/// Markers for a single calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkedDay {
    pub markers: Vec<DayMarker>,
    pub selected: bool,
}

pub type MarkedDates = BTreeMap<NaiveDate, MarkedDay>;

/// Expand events into markers on every day they occupy.
///
/// Markers on a day follow the order of `events`. Days no event covers are
/// absent, except `selected`, which is always present.
pub fn expand_to_daily_marks(events: &[Event], selected: NaiveDate) -> MarkedDates {
    let mut marks = MarkedDates::new();

    for event in events {
        // An end before the start reads as a single day
        let last = DayRange::of(event).last;
        for day in expansion_range(event).days() {
            marks.entry(day).or_default().markers.push(DayMarker {
                event_id: event.id.clone(),
                is_range_start: day == event.start_date(),
                is_range_end: day == last,
                color: event.color_or_default().to_string(),
            });
        }
    }

    marks.entry(selected).or_default().selected = true;
    marks
}
