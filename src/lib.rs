//! Library root for `keyword-bot`.
//!
//! Keyword-bot is a canned-response assistant for Slack designed to:
//! - Listen for incoming text messages
//! - Match them against stored keyword rules
//! - Reply with the first response of the matched category, or of a fallback category
//!
//! The bot integrates with Slack for chat and SurrealDB for storage. The architecture
//! is built around extensible traits that allow for different implementations of each
//! service.

pub mod base;
pub mod interaction;
pub mod resolver;
pub mod runtime;
pub mod service;

use base::{
    config::Config,
    types::{Res, Void},
};
use rustls::crypto;
use service::db::{DbClient, seed::SeedData};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the keyword-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database and chat clients
/// - Keeps the chat session alive and answers messages until Ctrl-C
pub async fn start(config: Config) -> Void {
    info!("Starting keyword-bot ...");

    config.validate_slack()?;

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the default crypto provider."))?;

    // Initialize the runtime.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let runtime = runtime::Runtime::new(config, events_tx).await?;

    // Run until interrupted.
    tokio::select! {
        result = runtime.start(events_rx) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            warn!("Interrupted; shutting down ...");
        }
    }

    runtime.shutdown().await
}

/// Resolves a single text against the configured store, without a chat session.
///
/// Returns the response text, or `None` when the bot would stay silent.
pub async fn resolve_once(config: Config, text: &str) -> Res<Option<String>> {
    let db = DbClient::surreal(&config).await?;

    if let Some(path) = &config.seed_path {
        SeedData::load(path)?.apply(&db).await?;
    }

    let resolver = resolver::Resolver::new(db, config.fallback_category_id);
    let response = resolver.resolve(text).await?;

    Ok(response.map(|r| r.text))
}
