use serde::Serialize;

use crate::clock::TimeOfDay;
use crate::models::{Activity, ActivitySource, ActivityStatus, CaregiverUpdate, Routine};

use super::status::{resolve_with, StatusPolicy};

/// Merge routine entries and tagged caregiver updates into one day timeline.
///
/// Routine entries are tagged [`ActivitySource::Routine`]; caregiver updates
/// with an activity type become completed [`ActivitySource::Caregiver`]
/// entries. The result is ordered by start time. Entries with a missing or
/// unparsable start time go last. The sort is stable, so equal times and the
/// untimed tail keep their input order.
pub fn aggregate(routines: &[Routine], updates: &[CaregiverUpdate]) -> Vec<Activity> {
    let mut activities: Vec<Activity> = routines
        .iter()
        .flat_map(|routine| routine.activities.iter().cloned())
        .map(|mut activity| {
            activity.source = ActivitySource::Routine;
            activity
        })
        .chain(updates.iter().filter_map(CaregiverUpdate::to_activity))
        .collect();

    activities.sort_by_key(|activity| {
        let start = activity.start();
        (start.is_none(), start)
    });

    tracing::debug!(
        routines = routines.len(),
        updates = updates.len(),
        entries = activities.len(),
        "aggregated timeline"
    );

    activities
}

/// A timeline entry paired with its status at some reference time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedActivity {
    pub activity: Activity,
    pub status: ActivityStatus,
}

pub fn resolve_all(
    activities: Vec<Activity>,
    now: TimeOfDay,
    policy: &StatusPolicy,
) -> Vec<ResolvedActivity> {
    activities
        .into_iter()
        .map(|activity| {
            let status = resolve_with(&activity, now, policy);
            ResolvedActivity { activity, status }
        })
        .collect()
}
