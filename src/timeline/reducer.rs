//! Single owner of the day's timeline state.
//!
//! Fetch results and push events are sent as [`TimelineEvent`] messages to a
//! reducer task. The task is the only writer; readers get immutable
//! snapshots through a `watch` channel.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::{Activity, CaregiverUpdate, DaySnapshot, PushEvent, Routine};

use super::aggregate::aggregate;

const EVENT_BUFFER: usize = 64;

/// Input to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    /// Fresh data for the day; replaces routines and updates wholesale.
    Snapshot(DaySnapshot),
    /// A fetch gave up. Existing data is kept.
    FetchFailed(String),
    /// The watched day rolled over; the previous day's data is dropped.
    DayChanged(NaiveDate),
    Push(PushEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineState {
    pub date: NaiveDate,
    pub routines: Vec<Routine>,
    pub updates: Vec<CaregiverUpdate>,
    pub online_users: BTreeSet<String>,
    /// Displayable error from the last failed fetch, cleared by a snapshot.
    pub last_error: Option<String>,
    /// Bumped on every applied change.
    pub revision: u64,
}

impl TimelineState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            routines: Vec::new(),
            updates: Vec::new(),
            online_users: BTreeSet::new(),
            last_error: None,
            revision: 0,
        }
    }

    /// The merged, sorted timeline for the current state.
    pub fn activities(&self) -> Vec<Activity> {
        aggregate(&self.routines, &self.updates)
    }

    /// Apply one event. Returns whether anything changed.
    pub fn apply(&mut self, event: TimelineEvent) -> bool {
        let changed = match event {
            TimelineEvent::Snapshot(snapshot) => {
                let changed = self.routines != snapshot.routines
                    || self.updates != snapshot.updates
                    || self.last_error.is_some();
                self.routines = snapshot.routines;
                self.updates = snapshot.updates;
                self.last_error = None;
                changed
            }
            TimelineEvent::FetchFailed(message) => {
                let changed = self.last_error.as_deref() != Some(message.as_str());
                self.last_error = Some(message);
                changed
            }
            TimelineEvent::DayChanged(date) => {
                if date == self.date {
                    false
                } else {
                    tracing::info!(%date, "timeline day changed");
                    self.date = date;
                    self.routines.clear();
                    self.updates.clear();
                    self.last_error = None;
                    true
                }
            }
            TimelineEvent::Push(push) => self.apply_push(push),
        };

        if changed {
            self.revision += 1;
        }
        changed
    }

    fn apply_push(&mut self, push: PushEvent) -> bool {
        match push {
            PushEvent::RoutineUpdate(routine) => {
                if routine.date.is_some_and(|date| date != self.date) {
                    tracing::debug!(date = ?routine.date, "ignoring routine update for another day");
                    return false;
                }
                let existing = routine.id.as_ref().and_then(|id| {
                    self.routines
                        .iter()
                        .position(|r| r.id.as_ref() == Some(id))
                });
                match existing {
                    Some(index) if self.routines[index] == routine => false,
                    Some(index) => {
                        self.routines[index] = routine;
                        true
                    }
                    None => {
                        self.routines.push(routine);
                        true
                    }
                }
            }
            PushEvent::CaregiverUpdate(update) => {
                self.updates.push(update);
                true
            }
            PushEvent::UserOnline(presence) => self.online_users.insert(presence.user_id),
            PushEvent::UserOffline(presence) => self.online_users.remove(&presence.user_id),
        }
    }
}

/// Handle to a running reducer task.
pub struct TimelineHandle {
    sender: mpsc::Sender<TimelineEvent>,
    state: watch::Receiver<Arc<TimelineState>>,
    task: JoinHandle<()>,
}

impl TimelineHandle {
    pub fn sender(&self) -> mpsc::Sender<TimelineEvent> {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TimelineState>> {
        self.state.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> Arc<TimelineState> {
        self.state.borrow().clone()
    }

    /// Drop this handle's sender and wait for the task to drain. The task
    /// exits once every cloned sender is gone as well.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.task.await {
            tracing::warn!("timeline reducer task failed: {}", e);
        }
    }
}

/// Start a reducer task owning `initial`.
pub fn spawn(initial: TimelineState) -> TimelineHandle {
    let (sender, mut receiver) = mpsc::channel::<TimelineEvent>(EVENT_BUFFER);
    let (state_tx, state_rx) = watch::channel(Arc::new(initial.clone()));

    let task = tokio::spawn(async move {
        let mut state = initial;
        while let Some(event) = receiver.recv().await {
            if state.apply(event) {
                tracing::debug!(revision = state.revision, "timeline updated");
                state_tx.send_replace(Arc::new(state.clone()));
            }
        }
        tracing::debug!("timeline reducer stopped");
    });

    TimelineHandle {
        sender,
        state: state_rx,
        task,
    }
}
