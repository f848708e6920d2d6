//! qualitair daemon: samples the sensors, stores readings and serves the
//! read API.
//!
//! Run with: `cargo run -p qualitair-service -- --simulate`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qualitair_core::mock::{MockAirQuality, MockClimate};
use qualitair_core::{AcquisitionLoop, SampleReader, StopHandle};
use qualitair_service::{AppState, Config, SensorConfig, StoreGateway, api};
use qualitair_store::Store;

/// Air-quality acquisition daemon for the SGP30 and DHT22.
#[derive(Parser, Debug)]
#[command(name = "qualitair")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Seconds between samples (overrides config).
    #[arg(long)]
    delay: Option<f64>,

    /// Disable the HTTP server (acquisition only).
    #[arg(long)]
    no_server: bool,

    /// Use simulated sensors instead of hardware.
    #[arg(long)]
    simulate: bool,

    /// Stop after this many samples.
    #[arg(short = 'n', long)]
    samples: Option<u64>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

const LOG_TARGETS: [&str; 3] = ["qualitair_service", "qualitair_core", "qualitair_store"];

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;
    build_runtime()?.block_on(run(args))
}

/// Multi-threaded runtime with at least two workers. Store calls block the
/// worker that holds the store lock.
fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    let workers = std::thread::available_parallelism().map_or(2, |n| n.get().max(2));
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;
    let state = AppState::new(store, config.clone());

    let reader = build_reader(&config.sensors, args.simulate)?;

    let stop = StopHandle::new();
    spawn_signal_handler(stop.clone());

    let server = if config.server.enabled {
        Some(spawn_server(Arc::clone(&state), &config.server.bind, stop.clone()).await?)
    } else {
        info!("HTTP server disabled");
        None
    };

    let acquisition = AcquisitionLoop::new(
        reader,
        StoreGateway::new(Arc::clone(&state)),
        config.acquisition_config(args.samples),
    )
    .with_stop_handle(stop.clone());
    let result = acquisition.run().await;

    // The server shares the stop flag; make sure it drains even when the
    // loop ended on its own.
    stop.quit();
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("HTTP server error: {e}"),
            Err(e) => warn!("HTTP server task failed: {e}"),
        }
    }

    let summary = result?;
    info!(
        ticks = summary.ticks,
        persisted = summary.persisted,
        "qualitair stopped"
    );
    Ok(())
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LOG_TARGETS.map(|t| format!("{t}=info")).join(",")));
    if verbose {
        for target in LOG_TARGETS {
            filter = filter.add_directive(format!("{target}=debug").parse()?);
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(path) = &args.database {
        config.storage.path = path.clone();
    }
    if let Some(delay) = args.delay {
        config.acquisition.query_delay_secs = delay;
    }
    if args.no_server {
        config.server.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn build_reader(sensors: &SensorConfig, simulate: bool) -> anyhow::Result<SampleReader> {
    if simulate {
        info!("Using simulated sensors");
        let mut reader = SampleReader::new(MockAirQuality::simulated());
        if sensors.enable_dht22 {
            reader = reader.with_climate(MockClimate::simulated());
        }
        return Ok(reader);
    }
    open_hardware(sensors)
}

#[cfg(target_os = "linux")]
fn open_hardware(sensors: &SensorConfig) -> anyhow::Result<SampleReader> {
    use qualitair_core::{Dht22, Sgp30};

    let sgp30 = Sgp30::open(&sensors.i2c_bus, sensors.sgp30_address)
        .with_context(|| format!("Failed to open SGP30 on {}", sensors.i2c_bus.display()))?;
    let mut reader = SampleReader::new(sgp30);

    if sensors.enable_dht22 {
        let dht22 = Dht22::open_in(&sensors.iio_root, sensors.dht22_pin)
            .with_context(|| format!("Failed to find DHT22 on GPIO {}", sensors.dht22_pin))?;
        info!(device = %dht22.device_dir().display(), "DHT22 enabled");
        reader = reader.with_climate(dht22);
    }

    Ok(reader)
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(_sensors: &SensorConfig) -> anyhow::Result<SampleReader> {
    anyhow::bail!("hardware sensors are only supported on Linux; run with --simulate")
}

async fn spawn_server(
    state: Arc<AppState>,
    bind: &str,
    stop: StopHandle,
) -> anyhow::Result<JoinHandle<std::io::Result<()>>> {
    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Starting server on {}", listener.local_addr()?);

    Ok(tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.stopped().await })
            .await
    }))
}

fn spawn_signal_handler(stop: StopHandle) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested");
        stop.quit();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
