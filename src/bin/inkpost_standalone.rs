//! inkpost-standalone: the consistency core in a single process
//!
//! Builds the stores, the channel bus, every service and every listener
//! loop, then runs until Ctrl-C. Document stores are in memory; the counter
//! store follows `storage.type`.
//!
//! ## Configuration
//! ```yaml
//! storage:
//!   type: sqlite
//!   path: data/inkpost.db
//!
//! messaging:
//!   channel_capacity: 1024
//!
//! website:
//!   base_host: https://blog.example.com
//!   comment_enabled: true
//!
//! comment:
//!   latest_limit: 5
//! ```
//!
//! The file is `inkpost.yaml` in the working directory, or the path in
//! `INKPOST_CONFIG`. Every key can be overridden with
//! `INKPOST__<SECTION>__<KEY>`.

use std::sync::Arc;

use inkpost::app::{AppContext, Stores};
use inkpost::config::Config;
use inkpost::notify::LogNotifier;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    inkpost::utils::bootstrap::init_tracing();

    let config = Config::load(None).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting inkpost-standalone");

    let stores = Stores::from_config(&config.storage).await?;
    let ctx = AppContext::bootstrap(&config, stores, Arc::new(LogNotifier)).await?;

    let totals = ctx.counters().get_website_count_stats().await?;
    info!(
        posts = totals.post_count,
        comments = totals.comment_count,
        likes = totals.like_count,
        "Website counters"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    ctx.shutdown().await;
    Ok(())
}
