use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hatchling::client::HatchlingClient;
use hatchling::clock::TimeOfDay;
use hatchling::config::HatchlingConfig;
use hatchling::models::{latest_routine, Activity, ActivityType, CaregiverUpdate, Routine};
use hatchling::poll::Poller;
use hatchling::render::{render_summary, render_timeline};
use hatchling::timeline::{self, aggregate, resolve_all, summarize, StatusPolicy, TimelineState};

#[derive(Parser)]
#[command(name = "hatch")]
#[command(about = "Baby routine timeline from the Hatchling backend")]
struct Cli {
    /// Backend base URL (overrides config and HATCHLING_API_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// User whose data to show
    #[arg(long, global = true)]
    user: Option<String>,

    /// Serve sample data when the backend is unreachable
    #[arg(long, global = true)]
    offline_demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print one day's timeline
    Timeline {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Reference time (HH:MM), defaults to now
        #[arg(long, value_parser = parse_time)]
        at: Option<TimeOfDay>,
    },
    /// Poll the backend and re-print today's timeline on every change
    Watch {
        /// Poll interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
    /// Print the status of a single activity
    Resolve {
        /// Activity type (feeding, nap, ...)
        #[arg(long, default_value = "other")]
        kind: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Free-text duration, e.g. "45 minutes"
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        actual: Option<String>,
        /// Reference time (HH:MM), defaults to now
        #[arg(long, value_parser = parse_time)]
        at: Option<TimeOfDay>,
    },
    /// Check backend connectivity
    Health,
}

fn parse_time(s: &str) -> Result<TimeOfDay, String> {
    TimeOfDay::parse(s).ok_or_else(|| format!("expected HH:MM, got '{}'", s))
}

/// Initialize tracing on stderr so stdout carries only the rendered output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "hatchling=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<HatchlingConfig> {
    let mut config = HatchlingConfig::load()?;
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if let Some(user) = &cli.user {
        config.user_id = user.clone();
    }
    if cli.offline_demo {
        config.offline_demo = true;
    }
    tracing::debug!(
        environment = config.environment.as_str(),
        base_url = %config.base_url,
        user = %config.user_id,
        "loaded config"
    );
    Ok(config)
}

fn now_local() -> TimeOfDay {
    TimeOfDay::from(Local::now().time())
}

fn print_day(
    baby_name: &str,
    routines: &[Routine],
    updates: &[CaregiverUpdate],
    now: TimeOfDay,
    policy: &StatusPolicy,
) {
    let name = latest_routine(routines)
        .and_then(|routine| routine.baby_name.as_deref())
        .unwrap_or(baby_name);
    let resolved = resolve_all(aggregate(routines, updates), now, policy);
    let summary = summarize(&resolved, updates, now);

    println!("{}'s day (as of {})", name, now);
    print!("{}", render_timeline(&resolved));
    println!();
    print!("{}", render_summary(&summary));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli)?;
    let session = config.session();
    let policy = config.status_policy();

    match cli.command {
        Commands::Timeline { date, at } => {
            let client = HatchlingClient::from_config(&config);
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let fetched = client
                .fetch_day(&session, Some(date))
                .await
                .with_context(|| format!("Failed to load timeline from {}", client.base_url()))?;
            if fetched.is_fallback() {
                eprintln!("Backend unreachable; showing fallback data.");
            }
            let now = at.unwrap_or_else(now_local);
            print_day(
                session.display_name(),
                &fetched.data.routines,
                &fetched.data.updates,
                now,
                &policy,
            );
        }
        Commands::Watch { interval_ms } => {
            let client = HatchlingClient::from_config(&config);
            let interval = interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.poll_interval());
            let today = Local::now().date_naive();

            let handle = timeline::reducer::spawn(TimelineState::new(today));
            let mut updates = handle.subscribe();
            let poller = Poller::follow(
                client,
                session.clone(),
                || Local::now().date_naive(),
                interval,
                handle.sender(),
            );
            tracing::info!("Watching {} every {:?}", config.base_url, interval);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = handle.current();
                        if let Some(error) = &state.last_error {
                            eprintln!("{}", error);
                        }
                        println!("== {} ==", state.date);
                        print_day(
                            session.display_name(),
                            &state.routines,
                            &state.updates,
                            now_local(),
                            &policy,
                        );
                    }
                }
            }

            poller.stop().await;
            handle.shutdown().await;
        }
        Commands::Resolve {
            kind,
            start,
            end,
            duration,
            actual,
            at,
        } => {
            let activity = Activity {
                kind: ActivityType::from_str(&kind).unwrap_or(ActivityType::Other),
                start_time: start,
                end_time: end,
                actual_time: actual,
                duration,
                notes: None,
                source: Default::default(),
                caregiver_name: None,
            };
            let now = at.unwrap_or_else(now_local);
            let status = timeline::resolve_with(&activity, now, &policy);
            println!("{}", status.as_str());
        }
        Commands::Health => {
            let client = HatchlingClient::from_config(&config);
            if client.check_health().await {
                println!("{} is healthy", client.base_url());
            } else {
                anyhow::bail!("{} is not reachable or unhealthy", client.base_url());
            }
        }
    }

    Ok(())
}
