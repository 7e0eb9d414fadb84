//! Neogate - HTTP gateway for object storage networks

use clap::Parser;
use neogate_cli::{GatewayConfig, run_server_with_shutdown};
use neogate_cli::config::DevNetworkConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "neogate")]
#[command(about = "HTTP gateway translating REST requests into object network calls")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "NEOGATE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8082", env = "NEOGATE_PORT")]
    port: u16,

    /// Owner ID (hex) for uploads without a bearer token
    #[arg(long, env = "NEOGATE_DEFAULT_OWNER")]
    default_owner: Option<String>,

    /// Attach a Timestamp attribute to uploads that lack one
    #[arg(long, env = "NEOGATE_DEFAULT_TIMESTAMP")]
    default_timestamp: bool,

    /// Deflate zip archive entries
    #[arg(long, env = "NEOGATE_ZIP_COMPRESSION")]
    zip_compression: bool,

    /// Disable CORS headers
    #[arg(long, env = "NEOGATE_NO_CORS")]
    no_cors: bool,

    /// Starting epoch of the development network
    #[arg(long, default_value = "0", env = "NEOGATE_DEV_EPOCH")]
    dev_epoch: u64,

    /// Milliseconds per block of the development network
    #[arg(long, default_value = "1000", env = "NEOGATE_DEV_MS_PER_BLOCK")]
    dev_ms_per_block: i64,

    /// Epoch length in blocks of the development network
    #[arg(long, default_value = "240", env = "NEOGATE_DEV_EPOCH_DURATION")]
    dev_epoch_duration: u64,

    /// Container IDs (hex) to create on the development network
    #[arg(long = "container", env = "NEOGATE_CONTAINERS", value_delimiter = ',')]
    containers: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, env = "NEOGATE_DEBUG")]
    debug: bool,

    /// Log as JSON lines
    #[arg(long, env = "NEOGATE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse arguments
    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("neogate_cli={},tower_http=debug", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Neogate on {}:{}", args.host, args.port);

    if args.no_cors {
        tracing::warn!("⚠️  CORS is DISABLED - browsers on other origins cannot reach the gateway");
    }

    // Build configuration
    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        default_owner: args.default_owner,
        default_timestamp: args.default_timestamp,
        zip_compression: args.zip_compression,
        cors_enabled: !args.no_cors,
        dev_network: DevNetworkConfig {
            initial_epoch: args.dev_epoch,
            ms_per_block: args.dev_ms_per_block,
            epoch_duration: args.dev_epoch_duration,
            containers: args.containers,
        },
        ..Default::default()
    };

    // Run the server until Ctrl-C
    run_server_with_shutdown(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}
