use serde::{Deserialize, Serialize};

/// Who the dashboard is showing data for.
///
/// Passed explicitly to every client call; there is no process-wide
/// "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub baby_name: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            baby_name: None,
        }
    }

    /// Baby name to display, falling back to `"Baby"`.
    pub fn display_name(&self) -> &str {
        self.baby_name.as_deref().unwrap_or("Baby")
    }
}
