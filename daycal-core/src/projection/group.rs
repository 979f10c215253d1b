//! Grouping events by calendar day for list and agenda views.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::event::Event;
use crate::projection::days::expansion_range;

/// Events grouped under every day they occupy. Days without events are omitted.
pub fn group_by_day(events: &[Event]) -> BTreeMap<NaiveDate, Vec<&Event>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();

    for event in events {
        for day in expansion_range(event).days() {
            grouped.entry(day).or_default().push(event);
        }
    }

    grouped
}

/// Events grouped under their start date only, with `selected` always present.
pub fn agenda(events: &[Event], selected: NaiveDate) -> BTreeMap<NaiveDate, Vec<&Event>> {
    let mut items: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();

    for event in events {
        items.entry(event.start_date()).or_default().push(event);
    }

    items.entry(selected).or_default();
    items
}
