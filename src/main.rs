use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{normalize_base_url, Config};
use crate::relay::{router, AppState};
use crate::telemetry::init_telemetry;
use crate::upstream::UpstreamClient;

mod config;
mod error;
mod extractors;
mod relay;
mod telemetry;
mod upstream;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const DEFAULT_CONFIG_FILE: &str = "VisionRelay.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env)]
    otel_endpoint: Option<String>,

    /// Keep logging to the console while exporting to the OTLP endpoint
    #[arg(long, env)]
    console: bool,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_telemetry(&args.otel_endpoint, args.console)?;

    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == DEFAULT_CONFIG_FILE {
                Config::default().merge(args.opt_config)
            } else {
                exit_err!(
                    1,
                    "Failed to read configuration file {} with error: {}",
                    args.config_file,
                    err
                );
            }
        }
    };

    let base_url = match normalize_base_url(&config.upstream_url) {
        Ok(url) => url,
        Err(err) => exit_err!(
            1,
            "Invalid upstream URL {}: {}",
            config.upstream_url,
            err
        ),
    };
    let upstream = UpstreamClient::new(
        base_url,
        config.connect_timeout(),
        config.health_timeout(),
        config.forward_timeout(),
    )?;

    let app = router(AppState {
        upstream: upstream.clone(),
    })
    .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    info!("Upstream server: {}", upstream.base_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            tracing::error!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}
