use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Args;
use daycal_core::projection::parse_date;
use daycal_core::{EventDraft, EventId, Schedule};
use owo_colors::OwoColorize;

use crate::commands::App;
use crate::render::Render;

/// Optional event fields shared by `new` and `update`.
#[derive(Args)]
pub struct EventArgs {
    /// Last day of a multi-day event (YYYY-MM-DD)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Start time (HH:MM); makes the event timed
    #[arg(long, requires = "end_time")]
    pub start_time: Option<String>,

    /// End time (HH:MM)
    #[arg(long, requires = "start_time")]
    pub end_time: Option<String>,

    /// Pass "" to clear
    #[arg(long)]
    pub description: Option<String>,

    /// Pass "" to clear
    #[arg(long)]
    pub tag: Option<String>,

    /// Display color, e.g. "#34C759"; pass "" for the default
    #[arg(long)]
    pub color: Option<String>,
}

impl EventArgs {
    fn times(&self) -> Result<Option<(NaiveTime, NaiveTime)>> {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => Ok(Some((parse_time(start)?, parse_time(end)?))),
            _ => Ok(None),
        }
    }

    fn apply(&self, mut draft: EventDraft) -> Result<EventDraft> {
        if let Some((start, end)) = self.times()? {
            draft.schedule = Schedule::Timed { start, end };
        }
        if let Some(end) = &self.end {
            draft = draft.with_end_date(parse_date(end).map_err(anyhow::Error::msg)?);
        }
        if let Some(description) = &self.description {
            draft = draft.with_description(description.as_str());
        }
        if let Some(tag) = &self.tag {
            draft = draft.with_tag(tag.as_str());
        }
        if let Some(color) = &self.color {
            draft = draft.with_color(color.as_str());
        }
        Ok(draft)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{}'. Expected HH:MM", s))
}

pub async fn create(app: &App, title: String, date: String, args: EventArgs) -> Result<()> {
    let start_date = parse_date(&date).map_err(anyhow::Error::msg)?;
    let mut draft = args.apply(EventDraft::all_day(title, start_date))?;

    if draft.color.is_none() {
        if let Some(color) = &app.config.default_color {
            draft = draft.with_color(color.as_str());
        }
    }

    app.store.create(&draft).await?;

    println!("{} Created {}", "✓".green(), draft.render());
    Ok(())
}

pub async fn update(
    app: &App,
    id: String,
    title: Option<String>,
    date: Option<String>,
    all_day: bool,
    args: EventArgs,
) -> Result<()> {
    let events = app.events().await?;
    let Some(mut event) = events.into_iter().find(|e| e.id.as_str() == id) else {
        anyhow::bail!("No event with id '{}'", id);
    };

    let mut draft = event.draft();
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(date) = date {
        draft.start_date = parse_date(&date).map_err(anyhow::Error::msg)?;
    }
    if all_day {
        draft.schedule = Schedule::AllDay;
    }
    event.details = args.apply(draft)?;

    app.store.update(&event).await?;

    println!("{} Updated {}", "✓".green(), event.details.render());
    Ok(())
}

pub async fn delete(app: &App, id: String) -> Result<()> {
    app.store.delete(&EventId::new(id.as_str())).await?;

    println!("{} Deleted {}", "✓".green(), id.dimmed());
    Ok(())
}
