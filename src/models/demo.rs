use super::activity::{Activity, ActivityType};
use super::event::DaySnapshot;
use super::routine::Routine;

/// Sample day shown when the backend is unreachable and offline demo mode
/// is on.
pub fn demo_snapshot() -> DaySnapshot {
    let activities = vec![
        Activity::planned(ActivityType::Wake, "07:30")
            .with_actual_time("07:30")
            .with_notes("Woke up happy"),
        Activity::planned(ActivityType::Feeding, "08:00")
            .with_actual_time("08:00")
            .with_notes("Bottle, 4oz"),
        Activity::planned(ActivityType::Diaper, "09:15")
            .with_actual_time("09:15")
            .with_notes("Wet"),
        Activity::planned(ActivityType::Nap, "10:00")
            .with_duration("45 minutes")
            .with_notes("Slept for 45 minutes"),
        Activity::planned(ActivityType::Feeding, "12:00").with_notes("Bottle, 5oz"),
    ];

    let mut routine = Routine::new(activities);
    routine.id = Some("demo".to_string());
    routine.baby_name = Some("Baby".to_string());

    DaySnapshot {
        routines: vec![routine],
        updates: Vec::new(),
    }
}
