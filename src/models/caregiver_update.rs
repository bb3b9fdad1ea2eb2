use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::activity::{Activity, ActivitySource, ActivityType};

/// An ad-hoc log entry from a caregiver (usually arriving by SMS).
///
/// Only updates tagged with an `activity_type` show up on the timeline; the
/// rest are free-text messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaregiverUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub baby_name: Option<String>,
    /// When the update was received.
    #[serde(default, deserialize_with = "crate::clock::deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Blank values count as untagged.
    #[serde(default, deserialize_with = "deserialize_activity_type")]
    pub activity_type: Option<ActivityType>,
    /// `"HH:MM"` the activity happened at.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub caregiver_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub from_number: Option<String>,
}

impl CaregiverUpdate {
    /// Convert into a completed timeline entry. `time` becomes both the start
    /// and the actual time. Returns `None` for untagged updates.
    pub fn to_activity(&self) -> Option<Activity> {
        let kind = self.activity_type?;
        Some(Activity {
            kind,
            start_time: self.time.clone(),
            end_time: None,
            actual_time: self.time.clone(),
            duration: None,
            notes: self.notes.clone(),
            source: ActivitySource::Caregiver,
            caregiver_name: Some(
                self.caregiver_name
                    .clone()
                    .unwrap_or_else(|| "Caregiver".to_string()),
            ),
        })
    }
}

fn deserialize_activity_type<'de, D>(deserializer: D) -> Result<Option<ActivityType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ActivityType::from_str(s).unwrap_or(ActivityType::Other)))
}
