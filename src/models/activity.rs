use serde::{Deserialize, Serialize};

use crate::clock::{self, TimeOfDay};

/// One tracked event on a baby's day: a feeding, a nap, a diaper change.
///
/// An activity carries a planned time (`start_time`, optionally `end_time` or
/// a free-text `duration`) and/or the time it actually happened
/// (`actual_time`). All times are `"HH:MM"` strings exactly as the backend
/// sends them; parsing happens lazily through the accessors so that a
/// malformed value degrades a single entry instead of failing the payload.
///
/// Activities have no identity beyond their fields and are rebuilt on every
/// fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Set once someone logged the activity as done.
    #[serde(default)]
    pub actual_time: Option<String>,
    /// Free text such as `"45 minutes"`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: ActivitySource,
    /// Who logged it, for caregiver-sourced entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_name: Option<String>,
}

impl Activity {
    /// A planned routine entry with only a start time.
    pub fn planned(kind: ActivityType, start_time: impl Into<String>) -> Self {
        Self {
            kind,
            start_time: Some(start_time.into()),
            end_time: None,
            actual_time: None,
            duration: None,
            notes: None,
            source: ActivitySource::Routine,
            caregiver_name: None,
        }
    }

    pub fn with_end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn with_actual_time(mut self, actual_time: impl Into<String>) -> Self {
        self.actual_time = Some(actual_time.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn start(&self) -> Option<TimeOfDay> {
        self.start_time.as_deref().and_then(TimeOfDay::parse)
    }

    pub fn end(&self) -> Option<TimeOfDay> {
        self.end_time.as_deref().and_then(TimeOfDay::parse)
    }

    pub fn parsed_duration(&self) -> Option<chrono::Duration> {
        self.duration.as_deref().and_then(clock::parse_duration)
    }

    /// Display name, e.g. `"Feeding"`.
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }
}

/// Kinds of activity the product tracks.
///
/// Unrecognised kinds deserialize as `Other` so a single odd entry does not
/// reject a whole routine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Wake,
    Feeding,
    Diaper,
    Nap,
    Sleep,
    Play,
    Bath,
    Walk,
    Reading,
    Medicine,
    #[serde(other)]
    Other,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Feeding => "feeding",
            Self::Diaper => "diaper",
            Self::Nap => "nap",
            Self::Sleep => "sleep",
            Self::Play => "play",
            Self::Bath => "bath",
            Self::Walk => "walk",
            Self::Reading => "reading",
            Self::Medicine => "medicine",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "wake" => Some(Self::Wake),
            "feeding" => Some(Self::Feeding),
            "diaper" => Some(Self::Diaper),
            "nap" => Some(Self::Nap),
            "sleep" => Some(Self::Sleep),
            "play" => Some(Self::Play),
            "bath" => Some(Self::Bath),
            "walk" => Some(Self::Walk),
            "reading" => Some(Self::Reading),
            "medicine" => Some(Self::Medicine),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Wake => "Wake",
            Self::Feeding => "Feeding",
            Self::Diaper => "Diaper",
            Self::Nap => "Nap",
            Self::Sleep => "Sleep",
            Self::Play => "Play",
            Self::Bath => "Bath",
            Self::Walk => "Walk",
            Self::Reading => "Reading",
            Self::Medicine => "Medicine",
            Self::Other => "Activity",
        }
    }
}

/// Where an activity on the timeline came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    /// Planned in the baby's routine.
    #[default]
    Routine,
    /// Logged ad hoc by a caregiver.
    Caregiver,
}

/// Derived status of an activity relative to a reference time.
///
/// - `Completed`: an actual time was logged
/// - `InProgress`: the reference time falls inside the activity's window
/// - `Upcoming`: the activity starts later
/// - `Missed`: the window passed without a log
/// - `Unknown`: no usable start time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    Completed,
    InProgress,
    Upcoming,
    Missed,
    Unknown,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "inProgress",
            Self::Upcoming => "upcoming",
            Self::Missed => "missed",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "inProgress" => Some(Self::InProgress),
            "upcoming" => Some(Self::Upcoming),
            "missed" => Some(Self::Missed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}
