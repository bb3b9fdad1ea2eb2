//! Periodic refresh feeding the timeline reducer.

use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::HatchlingClient;
use crate::fetch::FetchError;
use crate::models::Session;
use crate::timeline::TimelineEvent;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

type DayFn = Box<dyn Fn() -> Option<NaiveDate> + Send>;

/// A running poll loop. Dropping it without [`Poller::stop`] leaves the task
/// running until the reducer goes away.
pub struct Poller {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Fetch `date` right away, then every `interval`, sending each result to
    /// `events`.
    pub fn start(
        client: HatchlingClient,
        session: Session,
        date: Option<NaiveDate>,
        interval: Duration,
        events: mpsc::Sender<TimelineEvent>,
    ) -> Self {
        Self::spawn(client, session, Box::new(move || date), interval, events)
    }

    /// Like [`Poller::start`], but asks `today` for the day before every
    /// fetch. When the answer changes, [`TimelineEvent::DayChanged`] is sent
    /// ahead of that day's data.
    pub fn follow<F>(
        client: HatchlingClient,
        session: Session,
        today: F,
        interval: Duration,
        events: mpsc::Sender<TimelineEvent>,
    ) -> Self
    where
        F: Fn() -> NaiveDate + Send + 'static,
    {
        Self::spawn(
            client,
            session,
            Box::new(move || Some(today())),
            interval,
            events,
        )
    }

    fn spawn(
        client: HatchlingClient,
        session: Session,
        day: DayFn,
        interval: Duration,
        events: mpsc::Sender<TimelineEvent>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let client = client.with_cancel(&cancel_token);
        let handle = tokio::spawn(poll_loop(
            client,
            session,
            day,
            interval.max(MIN_INTERVAL),
            events,
            cancel_token.clone(),
        ));
        Self {
            cancel_token,
            handle,
        }
    }

    /// Cancel the loop, including any fetch or backoff in flight, and wait
    /// for it to exit.
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("poll loop task failed to join: {}", e);
        }
    }
}

async fn poll_loop(
    client: HatchlingClient,
    session: Session,
    day: DayFn,
    interval: Duration,
    events: mpsc::Sender<TimelineEvent>,
    cancel_token: CancellationToken,
) {
    let mut current: Option<NaiveDate> = None;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("poll loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let date = day();
                if let Some(date) = date.filter(|d| current != Some(*d)) {
                    if events.send(TimelineEvent::DayChanged(date)).await.is_err() {
                        break;
                    }
                }
                current = date;

                let event = match client.fetch_day(&session, date).await {
                    Ok(fetched) => {
                        if fetched.is_fallback() {
                            tracing::info!(user = %session.user_id, "showing fallback data");
                        }
                        TimelineEvent::Snapshot(fetched.data)
                    }
                    Err(FetchError::Cancelled) => break,
                    Err(e) => TimelineEvent::FetchFailed(e.to_string()),
                };
                if events.send(event).await.is_err() {
                    tracing::debug!("timeline reducer gone; stopping poll loop");
                    break;
                }
            }
        }
    }
}
