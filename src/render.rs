//! Plain-text rendering of a resolved day for terminals.

use crate::models::{ActivitySource, ActivityStatus};
use crate::timeline::{DaySummary, ResolvedActivity};

const COMPLETED: char = '●';
const IN_PROGRESS: char = '◐';
const UPCOMING: char = '○';
const MISSED: char = '✗';
const UNKNOWN: char = '?';

/// Get the symbol for a status.
pub fn status_symbol(status: ActivityStatus) -> char {
    match status {
        ActivityStatus::Completed => COMPLETED,
        ActivityStatus::InProgress => IN_PROGRESS,
        ActivityStatus::Upcoming => UPCOMING,
        ActivityStatus::Missed => MISSED,
        ActivityStatus::Unknown => UNKNOWN,
    }
}

/// Render one line per entry.
///
/// Example output:
/// ```text
/// ● 07:00  Wake
/// ◐ 10:00  Nap (120 minutes)
/// ● 12:30  Diaper [Nanny] Wet diaper changed
/// ○ 13:00  Feeding
/// ? --:--  Bath
/// ```
pub fn render_timeline(timeline: &[ResolvedActivity]) -> String {
    let mut output = String::new();
    for entry in timeline {
        render_entry(&mut output, entry);
    }
    output
}

fn render_entry(output: &mut String, entry: &ResolvedActivity) {
    let activity = &entry.activity;
    let time = activity
        .start()
        .map(|t| t.format())
        .unwrap_or_else(|| "--:--".to_string());

    output.push(status_symbol(entry.status));
    output.push(' ');
    output.push_str(&time);
    output.push_str("  ");
    output.push_str(activity.title());

    if let Some(end) = activity.end() {
        output.push_str(&format!(" (until {})", end));
    } else if let Some(duration) = &activity.duration {
        output.push_str(&format!(" ({})", duration));
    }

    if activity.source == ActivitySource::Caregiver {
        let name = activity.caregiver_name.as_deref().unwrap_or("Caregiver");
        output.push_str(&format!(" [{}]", name));
    }

    if let Some(notes) = activity.notes.as_deref().filter(|n| !n.is_empty()) {
        output.push(' ');
        output.push_str(notes);
    }
    output.push('\n');
}

/// Render the status card and daily counters.
pub fn render_summary(summary: &DaySummary) -> String {
    let now = summary
        .current
        .as_ref()
        .or(summary.last.as_ref())
        .map(|entry| entry.activity.title())
        .unwrap_or("Awake");

    let next = summary
        .next
        .as_ref()
        .and_then(|entry| {
            entry
                .activity
                .start()
                .map(|start| format!("{} at {}", entry.activity.title(), start))
        })
        .unwrap_or_else(|| "None scheduled".to_string());

    let last_update = summary
        .last_update
        .map(|ts| ts.format("%H:%M UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());

    format!(
        "Now: {}\nNext: {}\nLast update: {}\nNaps {} · Feedings {} · On schedule {}%\n",
        now, next, last_update, summary.naps, summary.feedings, summary.on_schedule_percent
    )
}
