use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::activity::Activity;

/// A baby's planned schedule for one day.
///
/// Created by the backend when a parent submits a routine description and
/// replaced wholesale on every fetch. The activity list is kept in the order
/// the backend sent it; the timeline sorts it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub baby_name: Option<String>,
    #[serde(default, deserialize_with = "crate::clock::deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Day the routine applies to, when the backend scopes it.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "routine", default)]
    pub activities: Vec<Activity>,
}

impl Routine {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self {
            id: None,
            user_id: None,
            baby_name: None,
            created_at: None,
            date: None,
            activities,
        }
    }
}

/// The most recently created routine. Routines without `created_at` lose to
/// any routine that has one; among equals the first wins.
pub fn latest_routine(routines: &[Routine]) -> Option<&Routine> {
    routines.iter().reduce(|best, candidate| {
        if candidate.created_at > best.created_at {
            candidate
        } else {
            best
        }
    })
}
