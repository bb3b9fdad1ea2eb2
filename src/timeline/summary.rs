use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::TimeOfDay;
use crate::models::{ActivityStatus, ActivityType, CaregiverUpdate};

use super::aggregate::ResolvedActivity;

/// Completed/total counters for one kind of activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub completed: usize,
    pub total: usize,
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Dashboard overview of one resolved day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub naps: Tally,
    pub feedings: Tally,
    /// Completed entries as a rounded percentage of all entries.
    pub on_schedule_percent: u8,
    /// First entry currently in progress.
    pub current: Option<ResolvedActivity>,
    /// Latest entry that has started.
    pub last: Option<ResolvedActivity>,
    /// Earliest entry still to start.
    pub next: Option<ResolvedActivity>,
    /// Most recent caregiver update timestamp.
    pub last_update: Option<DateTime<Utc>>,
}

fn tally(timeline: &[ResolvedActivity], kind: ActivityType) -> Tally {
    timeline
        .iter()
        .filter(|entry| entry.activity.kind == kind)
        .fold(Tally::default(), |mut acc, entry| {
            acc.total += 1;
            if entry.status == ActivityStatus::Completed {
                acc.completed += 1;
            }
            acc
        })
}

/// Summarize a timeline that is already sorted by start time.
pub fn summarize(
    timeline: &[ResolvedActivity],
    updates: &[CaregiverUpdate],
    now: TimeOfDay,
) -> DaySummary {
    let completed = timeline
        .iter()
        .filter(|entry| entry.status == ActivityStatus::Completed)
        .count();
    let on_schedule_percent = if timeline.is_empty() {
        0
    } else {
        ((completed as f64 / timeline.len() as f64) * 100.0).round() as u8
    };

    let current = timeline
        .iter()
        .find(|entry| entry.status == ActivityStatus::InProgress)
        .cloned();

    let last = timeline
        .iter()
        .rev()
        .find(|entry| entry.activity.start().is_some_and(|start| start <= now))
        .cloned();

    let next = timeline
        .iter()
        .find(|entry| entry.activity.start().is_some_and(|start| start > now))
        .cloned();

    let last_update = updates.iter().filter_map(|update| update.timestamp).max();

    DaySummary {
        naps: tally(timeline, ActivityType::Nap),
        feedings: tally(timeline, ActivityType::Feeding),
        on_schedule_percent,
        current,
        last,
        next,
        last_update,
    }
}
