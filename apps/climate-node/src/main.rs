use anyhow::{Context, Result};
use clap::Parser;
use climate_node::config::{Config, Role, SensorKind};
use climate_node::control::{Actuators, EnvironmentController};
use climate_node::display::{Display, DisplayController, LatestSample, LogDisplay};
use climate_node::pipeline::SampleFanout;
use climate_node::processor::ReadingProcessor;
use climate_node::reporter::RemoteReporter;
use climate_node::sampler::SensorSampler;
use climate_node::sensor::{FixedSensor, SensorSource, SimulatedSensor};
use climate_node::store::Store;
use climate_node::{cli, routes, state, static_assets};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,climate_node=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        let hint = match err.kind() {
            std::io::ErrorKind::AddrInUse => "port already in use; pick another with --port",
            std::io::ErrorKind::AddrNotAvailable => "address not on this host; check --host",
            _ => "use --role client to sample without serving HTTP",
        };
        anyhow::Error::new(err).context(format!("cannot listen on {addr}: {hint}"))
    })
}

fn build_sensor(kind: SensorKind) -> Arc<dyn SensorSource> {
    match kind {
        SensorKind::Fixed => Arc::new(FixedSensor::default()),
        SensorKind::Simulated => Arc::new(SimulatedSensor::default()),
    }
}

/// One source for the sampler and one for `/sensor-data`. A simulated source
/// advances on every read, so HTTP reads must not step the sampler's walk.
fn build_sensors(kind: SensorKind) -> (Arc<dyn SensorSource>, Arc<dyn SensorSource>) {
    (build_sensor(kind), build_sensor(kind))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing()?;
    let config = Config::from_env(args.role)?;
    tracing::info!(
        role = ?config.role,
        node_id = %config.node_id,
        interval_secs = config.sample_interval.as_secs(),
        "climate-node starting"
    );

    let store = Store::open(&config.db_path)
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))?;
    let (sampler_sensor, http_sensor) = build_sensors(config.sensor);

    let actuators = if config.gpio_enabled {
        Actuators::sysfs(config.gpio_pins).context("failed to set up GPIO actuators")?
    } else {
        Actuators::in_memory()
    };
    let controller = EnvironmentController::new(config.thresholds, actuators);

    let latest = LatestSample::new();
    let panel: Option<Arc<dyn Display>> = if config.display_enabled {
        Some(Arc::new(LogDisplay))
    } else {
        None
    };
    let display = DisplayController::new(panel, latest.clone());

    let processor = ReadingProcessor::new(config.thresholds, store.clone(), config.node_id.clone());
    let mut fanout = SampleFanout::new(latest.clone(), processor, controller.clone(), display.clone());
    match &config.host_url {
        Some(host_url) => {
            let reporter = RemoteReporter::new(
                host_url,
                config.node_id.clone(),
                config.thresholds,
                config.report_timeout,
            )?;
            tracing::info!(endpoint = %reporter.endpoint(), mode = ?config.report_mode, "reporting to host");
            fanout = fanout.with_reporter(reporter, config.report_mode);
        }
        None if config.role == Role::Client => {
            tracing::warn!("client role without CLIMATE_HOST_URL; readings stay local");
        }
        None => {}
    }

    let cancel = CancellationToken::new();
    let sampler = SensorSampler::new(config.sample_interval, sampler_sensor)?
        .with_callback(fanout.into_callback())
        .start(cancel.clone());

    let mut server: Option<JoinHandle<Result<()>>> = None;
    if config.role == Role::Host {
        let state = state::AppState {
            node_id: config.node_id.clone(),
            thresholds: config.thresholds,
            store,
            sensor: http_sensor,
            latest,
            display: display.clone(),
            history_limit_max: config.history_limit_max,
        };
        let app = routes::router(state).fallback_service(static_assets::service(args.static_root.clone())?);
        let addr = args.bind_addr();
        let listener = bind_listener(&addr).await?;
        tracing::info!(bind = %addr, "climate-node HTTP listening");
        let shutdown = cancel.clone();
        server = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .context("http server failed")
        }));
    }

    let mut server_done = false;
    let server_exit = async {
        match server.as_mut() {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
        res = server_exit => {
            match res {
                Ok(Ok(())) => tracing::warn!("http server exited"),
                Ok(Err(err)) => tracing::error!(error = %err, "http server exited"),
                Err(err) => tracing::error!(error = %err, "http server task failed"),
            }
            server_done = true;
        }
    }

    cancel.cancel();
    if let Err(err) = sampler.join().await {
        tracing::error!(error = %err, "sampler did not exit cleanly");
    }
    if let Some(handle) = server.filter(|_| !server_done) {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "http server shutdown failed"),
            Err(err) => tracing::error!(error = %err, "http server task failed"),
        }
    }
    controller.shutdown();
    display.clear();
    tracing::info!("climate-node stopped");
    Ok(())
}
