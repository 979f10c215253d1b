//! Day projection: turning a flat event list into calendar-display data.
//!
//! Everything here is a pure function of its arguments. Multi-day events are
//! expanded one calendar day at a time across `[start_date, end_date]`; an
//! event without an end date occupies its start date only.

mod days;
mod group;
mod marks;

pub use days::{DayRange, Days, parse_date};
pub use group::{agenda, group_by_day};
pub use marks::{DayMarker, MarkedDates, MarkedDay, expand_to_daily_marks};

use chrono::NaiveDate;

use crate::event::Event;

/// Events whose inclusive day range contains `date`, in input order.
pub fn events_on_date(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|e| e.occurs_on(date)).collect()
}

/// Events whose title, description or tag contains `query`, ignoring case.
/// A blank query matches everything.
pub fn search<'a>(events: &'a [Event], query: &str) -> Vec<&'a Event> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return events.iter().collect();
    }

    events
        .iter()
        .filter(|e| {
            let details = &e.details;
            std::iter::once(details.title.as_str())
                .chain(details.description.as_deref())
                .chain(details.tag.as_deref())
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}
