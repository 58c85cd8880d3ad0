use anyhow::{Context, Result};
use clap::Parser;
use map_ascii_api::config::Config;
use map_ascii_api::render::{AsciiRenderer, LandMask};
use map_ascii_api::server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ASCII world map generation API
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Listen address, overrides API_LISTEN_ADDR
    #[arg(long)]
    listen_addr: Option<String>,

    /// Land mask file, overrides API_LAND_MASK
    #[arg(long, value_name = "PATH")]
    land_mask: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "map_ascii_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(listen_addr) = cli.listen_addr {
        config.listen_addr = listen_addr;
    }
    if let Some(land_mask) = cli.land_mask {
        config.land_mask = Some(land_mask);
    }

    // Serving without a mask is not an option.
    let mask = match &config.land_mask {
        Some(path) => LandMask::load(path)
            .with_context(|| format!("failed to load land mask from {}", path.display()))?,
        None => LandMask::embedded().context("failed to load embedded land mask")?,
    };
    tracing::info!(
        columns = mask.width(),
        rows = mask.height(),
        "land mask loaded"
    );

    let limits = &config.limits;
    tracing::info!(
        "limits: width={}..{} supersample={}..{} margin<={} char_aspect={:.1}..{:.1} rate={}/{}",
        limits.min_width,
        limits.max_width,
        limits.min_supersample,
        limits.max_supersample,
        limits.max_margin,
        limits.min_char_aspect,
        limits.max_char_aspect,
        config.rate_limit,
        humantime::format_duration(config.rate_window),
    );
    tracing::debug!(
        config = %serde_json::to_string(&config).context("failed to serialize configuration")?,
        "effective configuration"
    );

    let renderer = Arc::new(AsciiRenderer::new(Arc::new(mask)));
    let server = Server::new(&config, renderer);

    server.run().await.context("server failed")?;

    Ok(())
}
