//! Repricer entry point.
//!
//! Event-driven marketplace repricing: consumes Amazon ANY_OFFER_CHANGED
//! notifications and Walmart buy-box webhooks, decides per event whether
//! the listing should be repriced, and writes the calculated price for the
//! downstream feed builder.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Marketplace repricing engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Resolve and print the configuration, then exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    repricer_telemetry::init_logging()?;

    let config = repricer_app::AppConfig::from_env()?;
    config.validate()?;

    if args.check_config {
        println!("{config:#?}");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        redis_url = %config.redis_url,
        queues = config.sqs_queue_urls.len(),
        bind = %config.http_bind,
        "starting repricer"
    );

    let app = repricer_app::Application::new(config).await?;
    app.run().await?;

    Ok(())
}
