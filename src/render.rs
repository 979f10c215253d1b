//! Terminal rendering for daycal types.
//!
//! Extension traits that add colored output to daycal-core types using owo_colors.

use chrono::{Datelike, Local, NaiveDate};
use daycal_core::projection::{DayRange, MarkedDates, MarkedDay};
use daycal_core::{Event, EventDraft, Schedule};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Schedule {
    fn render(&self) -> String {
        match self {
            Schedule::AllDay => format!("{:<11}", "all-day"),
            Schedule::Timed { start, end } => {
                format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
            }
        }
    }
}

impl Render for EventDraft {
    fn render(&self) -> String {
        let mut line = format!(
            "{} {} {}",
            swatch(self.color_or_default()),
            self.schedule.render().dimmed(),
            self.title
        );

        if self.is_multi_day() {
            let span = format!(
                "({} → {})",
                self.start_date.format("%b %-d"),
                self.last_date().format("%b %-d")
            );
            line.push_str(&format!(" {}", span.dimmed()));
        }
        if let Some(tag) = &self.tag {
            line.push_str(&format!(" {}", format!("#{}", tag).cyan()));
        }
        line
    }
}

impl Render for Event {
    fn render(&self) -> String {
        format!("{} {}", self.details.render(), self.id.dimmed())
    }
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
pub fn date_label(date: NaiveDate) -> String {
    let today = Local::now().date_naive();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

/// Print events under day headings, or a dimmed note when there are none.
pub fn day_sections<'a>(sections: impl IntoIterator<Item = (NaiveDate, Vec<&'a Event>)>) {
    let mut printed = false;

    for (date, events) in sections {
        if printed {
            println!();
        }
        println!("{}", date_label(date).bold());
        if events.is_empty() {
            println!("  {}", "No events".dimmed());
        }
        for event in events {
            println!("  {}", event.render());
        }
        printed = true;
    }

    if !printed {
        println!("{}", "No events found".dimmed());
    }
}

/// A Monday-first month grid. Marked days take the color of their first
/// event; the selected day is shown reversed.
pub fn month_grid(range: DayRange, marks: &MarkedDates, week_numbers: bool) -> String {
    let gutter = if week_numbers { "   " } else { "" };
    let title = range.first.format("%B %Y").to_string();

    let mut lines = vec![
        format!("{}{}", gutter, format!("{:^20}", title).bold()),
        format!("{}{}", gutter, "Mo Tu We Th Fr Sa Su".dimmed()),
    ];

    let offset = range.first.weekday().num_days_from_monday() as usize;
    let mut row: Vec<String> = vec!["  ".to_string(); offset];

    for day in range.days() {
        row.push(day_cell(day, marks.get(&day)));

        if row.len() == 7 || day == range.last {
            let week = if week_numbers {
                format!("{:>2} ", day.iso_week().week()).dimmed().to_string()
            } else {
                String::new()
            };
            lines.push(format!("{}{}", week, row.join(" ")));
            row.clear();
        }
    }

    lines.join("\n")
}

fn day_cell(day: NaiveDate, marked: Option<&MarkedDay>) -> String {
    let mut cell = format!("{:>2}", day.day());

    if let Some(marker) = marked.and_then(|m| m.markers.first()) {
        cell = match hex_rgb(&marker.color) {
            Some((r, g, b)) => cell.truecolor(r, g, b).bold().to_string(),
            None => cell.bold().to_string(),
        };
    }
    if marked.is_some_and(|m| m.selected) {
        cell = cell.reversed().to_string();
    }
    cell
}

/// A colored dot for an event color, plain when the color isn't `#RRGGBB`.
fn swatch(color: &str) -> String {
    match hex_rgb(color) {
        Some((r, g, b)) => "●".truecolor(r, g, b).to_string(),
        None => "●".to_string(),
    }
}

fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
