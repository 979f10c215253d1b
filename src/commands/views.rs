use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use daycal_core::projection::{self, DayRange};
use owo_colors::OwoColorize;

use crate::commands::{App, date_or_today};
use crate::render::{self, Render};

/// Days shown by `list` when no end date is given.
const LIST_DAYS: i64 = 7;

pub async fn list(app: &App, from: Option<String>, to: Option<String>) -> Result<()> {
    let range = DayRange::from_args(from.as_deref(), to.as_deref(), LIST_DAYS)
        .map_err(anyhow::Error::msg)?;
    let events = app.events().await?;

    let grouped = projection::group_by_day(&events);
    render::day_sections(
        grouped
            .range(range.first..=range.last)
            .map(|(date, events)| (*date, events.clone())),
    );
    Ok(())
}

pub async fn day(app: &App, date: Option<String>) -> Result<()> {
    let date = date_or_today(date.as_deref())?;
    let events = app.events().await?;

    render::day_sections([(date, projection::events_on_date(&events, date))]);
    Ok(())
}

pub async fn month(app: &App, month: Option<String>, select: Option<String>) -> Result<()> {
    let today = Local::now().date_naive();
    let selected = date_or_today(select.as_deref())?;

    let (year, month) = match month {
        Some(s) => parse_month(&s)?,
        None => (today.year(), today.month()),
    };
    let range = DayRange::month(year, month)
        .with_context(|| format!("Invalid month {}-{:02}", year, month))?;

    let events = app.events().await?;
    let marks = projection::expand_to_daily_marks(&events, selected);

    println!(
        "{}",
        render::month_grid(range, &marks, app.config.show_week_numbers)
    );

    if range.contains(selected) {
        println!();
        render::day_sections([(selected, projection::events_on_date(&events, selected))]);
    }
    Ok(())
}

pub async fn agenda(app: &App, select: Option<String>) -> Result<()> {
    let selected = date_or_today(select.as_deref())?;
    let events = app.events().await?;

    render::day_sections(projection::agenda(&events, selected));
    Ok(())
}

pub async fn search(app: &App, query: &str) -> Result<()> {
    let events = app.events().await?;
    let mut found = projection::search(&events, query);

    if found.is_empty() {
        println!("{}", format!("No events match '{}'", query).dimmed());
        return Ok(());
    }

    found.sort_by_key(|e| (e.start_date(), e.schedule().start_time()));
    for event in found {
        println!(
            "{} {}",
            event.start_date().format("%Y-%m-%d").bold(),
            event.render()
        );
    }
    Ok(())
}

/// Parse YYYY-MM
fn parse_month(s: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}'. Expected YYYY-MM", s))?;
    Ok((first.year(), first.month()))
}
