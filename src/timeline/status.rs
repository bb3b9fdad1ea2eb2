//! Activity status derivation.
//!
//! The resolver uses whatever timing information an entry carries, in a
//! fixed order: a logged actual time wins, then an explicit end time, then a
//! parsable duration, and finally a grace window after the start.

use chrono::Duration;

use crate::clock::TimeOfDay;
use crate::models::{Activity, ActivityStatus};

/// Default grace window after a bare start time during which the activity
/// counts as in progress.
pub const DEFAULT_GRACE_MINUTES: i64 = 30;

/// Tunables for [`resolve_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Applies only to entries with neither an end time nor a duration.
    pub grace_window: Duration,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            grace_window: Duration::minutes(DEFAULT_GRACE_MINUTES),
        }
    }
}

impl StatusPolicy {
    pub fn with_grace_minutes(minutes: i64) -> Self {
        Self {
            grace_window: Duration::minutes(minutes.max(0)),
        }
    }
}

/// Resolve with the default policy.
pub fn resolve(activity: &Activity, now: TimeOfDay) -> ActivityStatus {
    resolve_with(activity, now, &StatusPolicy::default())
}

pub fn resolve_with(activity: &Activity, now: TimeOfDay, policy: &StatusPolicy) -> ActivityStatus {
    if activity.actual_time.is_some() {
        return ActivityStatus::Completed;
    }

    let Some(start) = activity.start() else {
        return ActivityStatus::Unknown;
    };

    if let Some(end) = activity.end() {
        return bracket(start, end, now);
    }

    if let Some(duration) = activity.parsed_duration() {
        return bracket(start, start.plus(duration), now);
    }

    bracket(start, start.plus(policy.grace_window), now)
}

/// Inclusive window check.
fn bracket(start: TimeOfDay, end: TimeOfDay, now: TimeOfDay) -> ActivityStatus {
    if now < start {
        ActivityStatus::Upcoming
    } else if now <= end {
        ActivityStatus::InProgress
    } else {
        ActivityStatus::Missed
    }
}
