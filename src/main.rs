// src/main.rs v3
//! Plant Scout - field sync and GPS service for a plant sighting catalog

use clap::{ArgAction, Parser, Subcommand};
use plant_scout::{
    config::ScoutConfig,
    error::{Result, ScoutError},
    gps::{self, reader::FixOutcome},
    logging::{self, Verbosity},
    model::{GeoPoint, PlantRecord},
    store::{FirestoreClient, PlantStore},
    sync::{fetch, MarkerCache, RefreshPolicy, SyncService},
    view::ConsoleView,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "plant-scout", version, about = "Field sync and GPS service for a plant sighting catalog")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background sync service with the marker console
    Sync {
        /// Override the document store base URL
        #[arg(long)]
        store_url: Option<String>,
        /// Override the document store project id
        #[arg(long)]
        project: Option<String>,
    },
    /// Acquire a single GPS fix and print it
    Fix {
        /// Serial port of the GPS receiver
        #[arg(long)]
        port: Option<String>,
        /// Serial baud rate
        #[arg(long)]
        baud: Option<u32>,
        /// Seconds to wait for a fix before giving up
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Catalog a plant sighting in the remote store
    Catalog {
        /// Common name (also the remote document key)
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        family: Option<String>,
        #[arg(long)]
        scientific: Option<String>,
        /// Sighting latitude (requires --lon)
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// Sighting longitude (requires --lat)
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Acquire the sighting coordinates from the GPS receiver
        #[arg(long, conflicts_with = "lat")]
        from_gps: bool,
        /// Attach an already-uploaded image URL
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List available serial ports
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(Verbosity::from_flag_count(cli.verbose));

    let config = ScoutConfig::load().unwrap_or_default();

    match cli.command {
        Command::Sync { store_url, project } => {
            let mut config = config;
            if let Some(url) = store_url {
                config.store.base_url = url;
            }
            if let Some(project) = project {
                config.store.project_id = project;
            }
            run_sync(config).await
        }
        Command::Fix { port, baud, wait } => run_fix(&config, port, baud, wait).await,
        Command::Catalog {
            name,
            description,
            family,
            scientific,
            lat,
            lon,
            from_gps,
            image_url,
        } => {
            let mut record = PlantRecord::new(name);
            record.description = description;
            record.family = family;
            record.scientific_name = scientific;
            let point = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
                _ if from_gps => acquire_point(&config).await?,
                _ => None,
            };
            run_catalog(&config, record, point, image_url).await
        }
        Command::Ports => gps::reader::list_serial_ports(),
    }
}

/// Build the blocking store client off the event loop; reqwest's blocking
/// client may not be constructed inside an async runtime.
async fn build_store(config: &ScoutConfig) -> Result<FirestoreClient> {
    let store_config = config.store.clone();
    tokio::task::spawn_blocking(move || FirestoreClient::new(&store_config))
        .await
        .map_err(|e| ScoutError::Other(format!("Store setup task failed: {}", e)))?
}

/// Wire up the fetch/poll/console pipeline and run it until Ctrl+C.
async fn run_sync(config: ScoutConfig) -> Result<()> {
    let store = Arc::new(build_store(&config).await?);
    let cache = Arc::new(MarkerCache::new());
    let (service, poller) = SyncService::new(store, Arc::clone(&cache));
    let service = Arc::new(service);
    let running = Arc::new(AtomicBool::new(true));

    // Periodic refresh with failure backoff
    let policy = RefreshPolicy::from_config(&config);
    tokio::spawn(fetch::run_refresh_loop(
        Arc::clone(&service),
        policy,
        Arc::clone(&running),
    ));

    // Fixed-cadence poll loop, the event-thread side of the handoff queue
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let poll_running = Arc::clone(&running);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        while poll_running.load(Ordering::Relaxed) {
            interval.tick().await;
            poller.tick();
        }
    });

    ConsoleView::new().run(cache, running).await
}

async fn run_fix(
    config: &ScoutConfig,
    port: Option<String>,
    baud: Option<u32>,
    wait: Option<u64>,
) -> Result<()> {
    let outcome = acquire_outcome(config, port, baud, wait).await?;
    match outcome {
        FixOutcome::Acquired(point) => println!("Fix: {}", point),
        FixOutcome::NoFix => println!("No fix: GPS stream ended or errored"),
        FixOutcome::TimedOut => println!("No fix within the deadline"),
        FixOutcome::Cancelled => println!("Fix acquisition cancelled"),
    }
    Ok(())
}

async fn run_catalog(
    config: &ScoutConfig,
    record: PlantRecord,
    point: Option<GeoPoint>,
    image_url: Option<String>,
) -> Result<()> {
    let name = record.common_name.clone();
    let store_config = config.store.clone();

    // Store calls block on network I/O, keep them off the event loop
    tokio::task::spawn_blocking(move || -> Result<()> {
        let store = FirestoreClient::new(&store_config)?;
        store.put_plant(&record)?;
        if let Some(point) = point {
            store.add_coordinate(&record.common_name, point)?;
        }
        if let Some(ref url) = image_url {
            store.add_image_ref(&record.common_name, url)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| ScoutError::Other(format!("Catalog task failed: {}", e)))??;

    println!("Catalogued {}", name);
    Ok(())
}

/// Acquire a fix for the catalog flow, mapping non-fix outcomes to `None`.
async fn acquire_point(config: &ScoutConfig) -> Result<Option<GeoPoint>> {
    match acquire_outcome(config, None, None, None).await? {
        FixOutcome::Acquired(point) => Ok(Some(point)),
        outcome => {
            eprintln!("Proceeding without coordinates ({:?})", outcome);
            Ok(None)
        }
    }
}

async fn acquire_outcome(
    config: &ScoutConfig,
    port: Option<String>,
    baud: Option<u32>,
    wait: Option<u64>,
) -> Result<FixOutcome> {
    let port = port
        .or_else(|| config.serial_port.clone())
        .ok_or_else(|| {
            ScoutError::Other(
                "No serial port configured; pass --port or set it in the config file".to_string(),
            )
        })?;
    let baud = baud.unwrap_or(config.serial_baudrate);
    let deadline = Duration::from_secs(wait.unwrap_or(config.fix_timeout_secs));

    // Ctrl+C cancels the acquisition instead of killing the process
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = Arc::clone(&cancel);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_clone.store(true, Ordering::Relaxed);
    });

    gps::acquire_fix(&port, baud, deadline, cancel).await
}
