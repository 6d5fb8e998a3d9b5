//! Follow one order against a running store and fly its drone.
//!
//! Reads `DRONETRACK_*` settings from the environment; flags override them.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dronetrack_client::StoreClient;
use dronetrack_tracker::config::Config;
use dronetrack_tracker::{LocalStatusBus, PlaybackStart, Tracker, Viewer};

/// Simulate a drone delivery for an order
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Order to track
    #[arg(long)]
    order_id: String,

    /// Store URL (defaults to DRONETRACK_STORE_URL)
    #[arg(long)]
    store_url: Option<String>,

    /// Viewing role: customer, merchant or admin
    #[arg(long, default_value = "merchant")]
    viewer: Viewer,

    /// Watch only, do not start playback
    #[arg(long)]
    no_playback: bool,

    /// Also poll the store's real telemetry feed
    #[arg(long)]
    poll: bool,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Playback tick in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("dronetrack_tracker=info".parse()?))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = args.store_url {
        config.store_url = url;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.params.tick_interval_ms = tick_ms;
    }

    println!("Connecting to store at {}...", config.store_url);
    let mut client = StoreClient::new(&config.store_url)?;
    client.set_request_id(Some(format!("dronetrack-sim-{}", args.order_id)));

    let report_every = config.params.tick_interval();
    let tracker = Tracker::open(
        Arc::new(client),
        Arc::new(LocalStatusBus::new()),
        config.params,
        &args.order_id,
        args.viewer,
    )
    .await
    .with_context(|| format!("opening order {}", args.order_id))?;

    if args.poll {
        tracker.start_polling()?;
    }
    if !args.no_playback {
        match tracker.start_playback().await? {
            PlaybackStart::Started => println!("Playback started"),
            PlaybackStart::Skipped => println!("Order already closed, nothing to play"),
            PlaybackStart::Arrived => println!("Drone is already at the destination"),
        }
    }

    let deadline = time::sleep(Duration::from_secs(args.timeout));
    tokio::pin!(deadline);
    let mut ticker = time::interval(report_every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = tracker.snapshot();
                if args.json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                } else if let Some(latest) = snapshot.latest {
                    println!(
                        "[{}] {:.5},{:.5} remaining={} eta={}",
                        snapshot.order_status,
                        latest.lat,
                        latest.lng,
                        snapshot
                            .metrics
                            .remaining_km
                            .map_or_else(|| "-".to_string(), |km| format!("{km:.2}km")),
                        snapshot
                            .metrics
                            .eta_minutes
                            .map_or_else(|| "-".to_string(), |min| format!("{min}min")),
                    );
                }
                if snapshot.order_status.is_final() && !tracker.is_playing() {
                    println!("Order {} is {}", snapshot.order_id, snapshot.order_status);
                    break;
                }
                if !args.poll && !tracker.is_playing() && !args.no_playback {
                    println!("Playback finished without arrival");
                    break;
                }
            }
            _ = &mut deadline => {
                eprintln!("Timed out after {}s", args.timeout);
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted");
                break;
            }
        }
    }

    tracker.close();
    Ok(())
}
