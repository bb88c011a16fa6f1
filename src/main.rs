use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waste_detector::{config, server};

/// Validates that a log filter string is usable
fn validate_log_level(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Environment variable overrides config; debug mode lowers the default
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if config.server.debug {
            "debug".to_string()
        } else {
            config.server.logs.level.clone()
        }
    });

    let filter = match validate_log_level(&log_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Human-readable output in debug mode, JSON otherwise
    if config.server.debug {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }

    info!("Starting waste detection server with log level: {}", log_level);
    info!("Configuration loaded successfully");

    server::run(config).await?;

    Ok(())
}
