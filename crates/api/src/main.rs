//! `ms-user` entry point: the API server plus the container health probe.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use api::clients::{GEO_TIMEOUT, HttpProductCatalog, HttpZoneDirectory, PRODUCT_TIMEOUT};
use api::config::{Config, LogFormat};
use api::probe::{self, DEFAULT_HEALTH_URL, ProbeOutcome, ProbeSettings};
use api::state::AppState;
use clap::{Parser, Subcommand};
use domain::{ProductCatalog, ZoneDirectory};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use store::{InMemoryUserStore, PostgresUserStore, UserStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error>;

/// User management service: sellers, shopkeepers, assignments and visits.
#[derive(Parser, Debug)]
#[command(name = "ms-user", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Probe the liveness endpoint once; exits 0 when the server answers.
    Healthcheck {
        #[arg(long, env = "HEALTHCHECK_URL", default_value = DEFAULT_HEALTH_URL)]
        url: String,
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Probe the liveness endpoint on the container schedule and log health changes.
    Monitor {
        #[arg(long, env = "HEALTHCHECK_URL", default_value = DEFAULT_HEALTH_URL)]
        url: String,
    },
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The probe runs inside the container healthcheck: no config, no logging.
    if let Some(Command::Healthcheck { url, timeout_secs }) = &cli.command {
        return healthcheck(url, Duration::from_secs(*timeout_secs)).await;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    let result = match cli.command {
        Some(Command::Monitor { url }) => monitor(url).await,
        _ => serve(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "ms-user stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn healthcheck(url: &str, timeout: Duration) -> ExitCode {
    let settings = ProbeSettings {
        url: url.to_string(),
        timeout,
        ..ProbeSettings::default()
    };

    match probe::probe_once(&reqwest::Client::new(), &settings).await {
        ProbeOutcome::Reachable { status } => {
            println!("healthy: {url} answered {status}");
            ExitCode::SUCCESS
        }
        ProbeOutcome::Unreachable { reason } => {
            eprintln!("unhealthy: {reason}");
            ExitCode::FAILURE
        }
    }
}

async fn monitor(url: String) -> Result<(), BoxError> {
    let settings = ProbeSettings {
        url,
        ..ProbeSettings::default()
    };
    tokio::select! {
        () = probe::run_monitor(reqwest::Client::new(), settings) => {}
        () = shutdown_signal() => {}
    }
    Ok(())
}

async fn serve(config: Config) -> Result<(), BoxError> {
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY is the built-in default; tokens can be forged");
    }

    let zones: Arc<dyn ZoneDirectory> =
        Arc::new(HttpZoneDirectory::new(config.geo_url.clone(), GEO_TIMEOUT)?);
    let products: Arc<dyn ProductCatalog> = Arc::new(HttpProductCatalog::new(
        config.product_url.clone(),
        PRODUCT_TIMEOUT,
    )?);

    match &config.database_url {
        Some(url) => {
            let store =
                PostgresUserStore::connect(url, config.database_max_connections).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            run(Arc::new(store), zones, products, &config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory only");
            run(
                Arc::new(InMemoryUserStore::new()),
                zones,
                products,
                &config,
                metrics_handle,
            ).await
        }
    }
}

async fn run<S: UserStore + 'static>(
    store: Arc<S>,
    zones: Arc<dyn ZoneDirectory>,
    products: Arc<dyn ProductCatalog>,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let state = Arc::new(AppState::new(store, zones, products, config));
    let app = api::create_app(state, config, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        prefix = %config.api_prefix,
        version = %config.app_version,
        "starting {}",
        config.app_name
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}
