use serde::{Deserialize, Serialize};

use super::caregiver_update::CaregiverUpdate;
use super::routine::Routine;

/// Everything fetched for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub routines: Vec<Routine>,
    pub updates: Vec<CaregiverUpdate>,
}

/// Presence payload for `user_online` / `user_offline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// A message from the backend's push channel.
///
/// Wire form is `{"event": "routine_update", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    RoutineUpdate(Routine),
    CaregiverUpdate(CaregiverUpdate),
    UserOnline(UserPresence),
    UserOffline(UserPresence),
}
