//! Domain models for Hatchling.
//!
//! # Core Concepts
//!
//! - [`Activity`]: One tracked event (feeding, nap, ...) with a planned and/or
//!   actual time. Times stay as the `"HH:MM"` strings the backend sends.
//! - [`Routine`]: A baby's planned schedule for a day; owns its activities.
//! - [`CaregiverUpdate`]: An ad-hoc log from a caregiver, optionally tagged
//!   with an activity type so it can appear on the timeline.
//! - [`Session`]: Which user the client is acting for.
//!
//! Nothing here is persisted; the client keeps at most the last good
//! snapshot per day in memory.

mod activity;
mod caregiver_update;
mod demo;
mod event;
mod routine;
mod session;

pub use activity::*;
pub use caregiver_update::*;
pub use demo::*;
pub use event::*;
pub use routine::*;
pub use session::*;
