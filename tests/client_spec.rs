//! Client, poller and reducer against an in-process backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::json;

use hatchling::client::{ClientError, HatchlingClient};
use hatchling::fetch::{FetchError, FetchPolicy, Origin};
use hatchling::models::*;
use hatchling::poll::Poller;
use hatchling::timeline::{self, TimelineState};

#[derive(Clone, Default)]
struct Backend {
    /// Requests to `/routines` seen so far.
    hits: Arc<AtomicU32>,
    /// Remaining `/routines` requests to answer with 503.
    failures: Arc<AtomicU32>,
    /// Answer everything with 503 while set.
    down: Arc<AtomicBool>,
}

async fn routines(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    if backend.down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "down"})));
    }
    let pending = backend.failures.load(Ordering::SeqCst);
    if pending > 0 {
        backend.failures.store(pending - 1, Ordering::SeqCst);
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "warming up"})));
    }
    if params.get("user_id").map(String::as_str) != Some("user_1") {
        return (StatusCode::OK, Json(json!([])));
    }
    (
        StatusCode::OK,
        Json(json!([{
            "id": "routine_1",
            "user_id": "user_1",
            "baby_name": "Mari",
            "created_at": "2025-04-09T10:00:00Z",
            "date": params.get("date"),
            "routine": [
                {"type": "nap", "start_time": "10:00", "duration": "120 minutes"},
                {"type": "wake", "start_time": "07:00"}
            ]
        }])),
    )
}

async fn sms(State(backend): State<Backend>) -> impl IntoResponse {
    if backend.down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "down"})));
    }
    (
        StatusCode::OK,
        Json(json!([{
            "id": "update_1",
            "activity_type": "diaper",
            "time": "12:30",
            "caregiver_name": "Nanny",
            "timestamp": "2025-04-09T12:30:00Z"
        }])),
    )
}

async fn health(State(backend): State<Backend>) -> impl IntoResponse {
    if backend.down.load(Ordering::SeqCst) {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "down"})))
    } else {
        (StatusCode::OK, Json(json!({"status": "healthy"})))
    }
}

async fn secured(headers: HeaderMap) -> impl IntoResponse {
    match headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        Some("Bearer secret") => (StatusCode::OK, Json(json!([]))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))),
    }
}

/// Records whose timestamps carry no UTC offset, as `isoformat()` writes them.
async fn naive_routines() -> Json<serde_json::Value> {
    Json(json!([{
        "id": "routine_1_1712656800",
        "user_id": "user_1",
        "created_at": "2025-04-09T10:00:00.123456",
        "routine": [{"type": "feeding", "start_time": "08:00"}]
    }]))
}

async fn naive_sms() -> Json<serde_json::Value> {
    Json(json!([{
        "id": "update_1_1712666400",
        "activity_type": "diaper",
        "time": "12:30",
        "timestamp": "2025-04-09T12:30:00.654321"
    }]))
}

async fn stalled() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Json(json!([]))
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/routines", get(routines))
        .route("/sms", get(sms))
        .route("/health", get(health))
        .with_state(backend);
    serve(app).await
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    format!("http://{}", addr)
}

fn fast_policy(max_retries: u32) -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(2),
        max_retries,
        base_delay: Duration::from_millis(10),
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 9).unwrap()
}

mod fetch_day {
    use super::*;

    #[tokio::test]
    async fn returns_routines_and_updates_for_the_user() {
        let base = spawn_backend(Backend::default()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));

        let fetched = client
            .fetch_day(&Session::new("user_1"), Some(day()))
            .await
            .expect("fetch should succeed");

        assert_eq!(fetched.origin, Origin::Fresh);
        assert_eq!(fetched.attempts, 1);
        assert_eq!(fetched.data.routines.len(), 1);
        assert_eq!(fetched.data.routines[0].date, Some(day()));
        assert_eq!(fetched.data.routines[0].activities.len(), 2);
        assert_eq!(fetched.data.updates.len(), 1);
        assert_eq!(fetched.data.updates[0].activity_type, Some(ActivityType::Diaper));
    }

    #[tokio::test]
    async fn passes_the_session_user() {
        let base = spawn_backend(Backend::default()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));

        let routines = client
            .get_routines(&Session::new("someone_else"), None)
            .await
            .expect("request should succeed");

        assert!(routines.is_empty());
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let backend = Backend::default();
        backend.failures.store(2, Ordering::SeqCst);
        let base = spawn_backend(backend.clone()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(3));

        let fetched = client
            .fetch_day(&Session::new("user_1"), None)
            .await
            .expect("fetch should eventually succeed");

        assert_eq!(fetched.attempts, 3);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let base = serve(Router::new()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(3));

        let result = client.fetch_day(&Session::new("user_1"), None).await;

        assert!(matches!(
            result,
            Err(FetchError::Failed {
                attempts: 1,
                source: ClientError::NotFound(_)
            })
        ));
    }

    #[tokio::test]
    async fn falls_back_to_last_good_snapshot() {
        let backend = Backend::default();
        let base = spawn_backend(backend.clone()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(1));
        let session = Session::new("user_1");

        let first = client.fetch_day(&session, Some(day())).await.unwrap();
        backend.down.store(true, Ordering::SeqCst);
        let second = client.fetch_day(&session, Some(day())).await.unwrap();

        assert_eq!(second.origin, Origin::Fallback);
        assert_eq!(second.attempts, 2);
        assert_eq!(second.data, first.data);
    }

    #[tokio::test]
    async fn surfaces_the_error_without_any_fallback() {
        let backend = Backend::default();
        backend.down.store(true, Ordering::SeqCst);
        let base = spawn_backend(backend).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(1));

        let result = client.fetch_day(&Session::new("user_1"), None).await;

        assert!(matches!(
            result,
            Err(FetchError::Failed {
                attempts: 2,
                source: ClientError::Server(_)
            })
        ));
    }

    #[tokio::test]
    async fn serves_demo_data_when_unreachable_in_offline_mode() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HatchlingClient::new(base, None)
            .with_policy(fast_policy(1))
            .with_offline_demo(true);

        let fetched = client
            .fetch_day(&Session::new("user_1"), None)
            .await
            .expect("demo fallback expected");

        assert!(fetched.is_fallback());
        assert_eq!(fetched.data, demo_snapshot());
    }

    #[tokio::test]
    async fn decodes_records_with_naive_timestamps() {
        let base = serve(
            Router::new()
                .route("/routines", get(naive_routines))
                .route("/sms", get(naive_sms)),
        )
        .await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));

        let fetched = client
            .fetch_day(&Session::new("user_1"), None)
            .await
            .expect("isoformat timestamps should decode");

        assert_eq!(fetched.origin, Origin::Fresh);
        let created = fetched.data.routines[0].created_at.expect("created_at parsed");
        assert_eq!(created.to_rfc3339(), "2025-04-09T10:00:00.123456+00:00");
        let received = fetched.data.updates[0].timestamp.expect("timestamp parsed");
        assert_eq!(received.to_rfc3339(), "2025-04-09T12:30:00.654321+00:00");
    }

    #[tokio::test]
    async fn cancel_aborts_a_stalled_fetch() {
        let base = serve(
            Router::new()
                .route("/routines", get(stalled))
                .route("/sms", get(stalled)),
        )
        .await;
        let client = HatchlingClient::new(base, None)
            .with_policy(fast_policy(3))
            .with_offline_demo(true);

        let canceller = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            client.fetch_day(&Session::new("user_1"), None),
        )
        .await
        .expect("cancel should end the fetch before its timeout");

        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn sends_the_api_key_as_bearer_token() {
        let base = serve(Router::new().route("/routines", get(secured))).await;

        let without = HatchlingClient::new(base.clone(), None);
        let err = without
            .get_routines(&Session::new("user_1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));

        let with = HatchlingClient::new(base, Some("secret".to_string()));
        let routines = with
            .get_routines(&Session::new("user_1"), None)
            .await
            .expect("authorized request should succeed");
        assert!(routines.is_empty());
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_healthy_backend() {
        let base = spawn_backend(Backend::default()).await;
        assert!(HatchlingClient::new(base, None).check_health().await);
    }

    #[tokio::test]
    async fn reports_unhealthy_backend() {
        let backend = Backend::default();
        backend.down.store(true, Ordering::SeqCst);
        let base = spawn_backend(backend).await;
        assert!(!HatchlingClient::new(base, None).check_health().await);
    }
}

mod polling {
    use super::*;

    #[tokio::test]
    async fn poller_feeds_the_reducer_until_stopped() {
        let backend = Backend::default();
        let base = spawn_backend(backend.clone()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));

        let handle = timeline::reducer::spawn(TimelineState::new(day()));
        let mut rx = handle.subscribe();
        let poller = Poller::start(
            client,
            Session::new("user_1"),
            Some(day()),
            Duration::from_millis(20),
            handle.sender(),
        );

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("reducer should publish a snapshot")
            .expect("reducer alive");

        let state = handle.current();
        assert_eq!(state.routines.len(), 1);
        assert_eq!(state.activities().len(), 3);
        assert!(state.last_error.is_none());

        poller.stop().await;
        let hits_after_stop = backend.hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.hits.load(Ordering::SeqCst), hits_after_stop);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn following_today_moves_to_the_next_day() {
        let base = spawn_backend(Backend::default()).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));
        let next = day().succ_opt().unwrap();
        let today = Arc::new(std::sync::Mutex::new(day()));

        let handle = timeline::reducer::spawn(TimelineState::new(day()));
        let mut rx = handle.subscribe();
        let clock = today.clone();
        let poller = Poller::follow(
            client,
            Session::new("user_1"),
            move || *clock.lock().unwrap(),
            Duration::from_millis(20),
            handle.sender(),
        );

        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.routines.is_empty()))
            .await
            .expect("first day should load")
            .expect("reducer alive");
        assert_eq!(handle.current().routines[0].date, Some(day()));

        *today.lock().unwrap() = next;
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.date == next && !s.routines.is_empty()),
        )
        .await
        .expect("poller should switch to the next day")
        .expect("reducer alive");

        let state = handle.current();
        assert_eq!(state.routines.len(), 1);
        assert_eq!(state.routines[0].date, Some(next));

        poller.stop().await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failed_polls_are_reported_to_the_reducer() {
        let backend = Backend::default();
        backend.down.store(true, Ordering::SeqCst);
        let base = spawn_backend(backend).await;
        let client = HatchlingClient::new(base, None).with_policy(fast_policy(0));

        let handle = timeline::reducer::spawn(TimelineState::new(day()));
        let mut rx = handle.subscribe();
        let poller = Poller::start(
            client,
            Session::new("user_1"),
            Some(day()),
            Duration::from_millis(20),
            handle.sender(),
        );

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("reducer should publish the error")
            .expect("reducer alive");

        let state = handle.current();
        assert!(state.last_error.as_deref().unwrap().contains("Server error"));
        assert!(state.routines.is_empty());

        poller.stop().await;
        handle.shutdown().await;
    }
}
