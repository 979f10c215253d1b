//! Flat document representation of events.
//!
//! The remote store keeps each event as a flat record of camelCase fields.
//! It rejects explicit `null` values, so every write goes through
//! [`defined_fields`], which drops unset fields instead of sending them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DaycalError, DaycalResult};
use crate::event::{Event, EventDraft, EventId, OwnerId, Schedule};

/// A record body as stored by the remote store (without its document id).
pub type Record = serde_json::Map<String, Value>;

/// The stored shape of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, with = "hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub owner_id: OwnerId,
}

impl EventRecord {
    pub fn from_draft(draft: &EventDraft, owner: &OwnerId) -> Self {
        EventRecord {
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            all_day: draft.schedule.is_all_day(),
            start_time: draft.schedule.start_time(),
            end_time: draft.schedule.end_time(),
            tag: draft.tag.clone(),
            color: draft.color.clone(),
            owner_id: owner.clone(),
        }
    }

    pub fn from_event(event: &Event) -> Self {
        Self::from_draft(&event.details, &event.owner)
    }

    /// Decode a stored record body.
    pub fn from_record(record: &Record) -> DaycalResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| DaycalError::Serialization(e.to_string()))
    }

    /// Project to the defined-field-only body sent to the remote store.
    pub fn to_record(&self) -> DaycalResult<Record> {
        defined_fields(self)
    }

    /// Attach the document id the store assigned.
    ///
    /// A record that is not marked all-day but lacks either clock time is
    /// read as all-day; the times carry no meaning without each other.
    pub fn into_event(self, id: EventId) -> Event {
        let schedule = match (self.all_day, self.start_time, self.end_time) {
            (false, Some(start), Some(end)) => Schedule::Timed { start, end },
            _ => Schedule::AllDay,
        };

        let details = EventDraft {
            title: self.title,
            description: self.description.filter(|s| !s.is_empty()),
            start_date: self.start_date,
            end_date: self.end_date,
            schedule,
            tag: self.tag.filter(|s| !s.is_empty()),
            color: self.color.filter(|s| !s.is_empty()),
        };

        Event::new(id, self.owner_id, details)
    }
}

/// Serialize `value` into a record, omitting every field whose value is unset.
pub fn defined_fields<T: Serialize>(value: &T) -> DaycalResult<Record> {
    let value =
        serde_json::to_value(value).map_err(|e| DaycalError::Serialization(e.to_string()))?;

    match strip_nulls(value) {
        Value::Object(map) => Ok(map),
        other => Err(DaycalError::Serialization(format!(
            "expected a record, got {}",
            other
        ))),
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// `HH:MM` clock times, optional.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
