use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zpool_exporter::{config::Config, server, zpool};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// ZFS pool to monitor; comma-separate to monitor several pools
    #[arg(short, long, env = "ZPOOL_EXPORTER__POOLS__NAMES")]
    pool: Option<String>,

    /// Port to listen on
    #[arg(long, env = "ZPOOL_EXPORTER__SERVER__PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "ZPOOL_EXPORTER__SERVER__ADDR")]
    addr: Option<String>,

    /// HTTP endpoint to export data on
    #[arg(long, env = "ZPOOL_EXPORTER__SERVER__ENDPOINT")]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Zpool Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Parse CLI arguments (clap handles --version: print and exit 0)
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(pool) = args.pool {
        config.pools.names = pool;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(endpoint) = args.endpoint {
        config.server.endpoint = endpoint;
    }

    // Validate every configured pool before binding anything. An unknown
    // pool aborts the process; there is no partial start.
    let timeout = Duration::from_secs(config.probe.timeout_seconds);
    let pools = match config.pool_names() {
        Ok(pools) => pools,
        Err(e) => {
            error!("Invalid pool configuration: {}", e);
            std::process::exit(1);
        }
    };
    for pool in &pools {
        if let Err(e) = zpool::pool_exists(pool, timeout) {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    info!("Monitoring pools: {}", pools.join(", "));
    info!(
        "Metrics endpoint: http://{}:{}/{}",
        config.server.addr, config.server.port, config.server.endpoint
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
