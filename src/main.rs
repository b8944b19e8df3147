//! Relaylink - master side of a multi-backend message relay
//!
//! A Telegram bot that relays messages between the operator and any number
//! of slave messaging backends, and lets the operator link Telegram groups
//! with individual slave chats.

mod bridge;
mod common;
mod config;
mod master;
mod slave;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::{ChannelBundle, ChatLinker, MessageRouter, Poller, RelayFormatter, SessionTracker};
use config::{env::get_config_path, load_and_validate};
use master::{MasterHandler, TelegramTransport};
use slave::{LoopbackSlave, SlaveRegistry};
use store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Relaylink v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Operator: {}", config.master.operator_id);
    info!("  Admins: {:?}", config.master.admins);
    match config.sessions.ttl_secs {
        Some(ttl) => info!("  Link dialogs expire after {}s", ttl),
        None => info!("  Link dialogs never expire"),
    }

    // ============================================================
    // Collaborators
    // ============================================================
    let channels = ChannelBundle::new();

    let store = Arc::new(MemoryStore::open(&config.store).await?);
    info!("  Associations: {}", store.associations().await.len());

    let mut registry = SlaveRegistry::new();
    if let Some(loopback) = config.slaves.loopback.as_ref().filter(|_| config.loopback_enabled()) {
        registry.register(Arc::new(LoopbackSlave::from_config(
            loopback,
            channels.slaves.inbound_tx.clone(),
        )));
    }
    if registry.is_empty() {
        warn!("No slave backends registered; only linking dialogs will work");
    } else {
        info!("{} slave backend(s) registered", registry.len());
    }
    let registry = Arc::new(registry);

    info!("Connecting to Telegram...");
    let transport = Arc::new(TelegramTransport::connect(&config.master.token).await?);

    // ============================================================
    // Relay core
    // ============================================================
    let operator = config.master.operator_id;
    let router = Arc::new(MessageRouter::new(
        store.clone(),
        registry.clone(),
        transport.clone(),
        RelayFormatter::new(&config.formats),
        operator,
    ));
    let linker = Arc::new(ChatLinker::new(
        SessionTracker::new(config.sessions.ttl_secs.map(Duration::from_secs)),
        store.clone(),
        registry.clone(),
        transport.clone(),
        operator,
    ));

    // ============================================================
    // Spawn tasks
    // ============================================================
    let shutdown_tx = channels.control.shutdown_tx;
    let master_shutdown_rx = channels.poller.shutdown_rx.clone();

    let mut poller_task = tokio::spawn(Poller::new(router.clone(), channels.poller).run());

    let handler = MasterHandler::new(transport, linker, router, config.allowed_users());
    let mut master_task = tokio::spawn(handler.run(master_shutdown_rx));

    // Held so the queue stays open even when no backend owns a sender.
    let _inbound_tx = channels.slaves.inbound_tx;

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        _ = &mut poller_task => {
            warn!("Polling loop ended unexpectedly");
            false
        }
        _ = &mut master_task => {
            warn!("Telegram polling ended unexpectedly");
            false
        }
    };

    // Signal both loops and give them a moment to finish what they are doing
    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed (tasks already exited): {}", e);
    }
    if shutdown {
        let timeout = Duration::from_secs(5);
        for (name, task) in [("Polling loop", poller_task), ("Telegram polling", master_task)] {
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => info!("{} stopped", name),
                Ok(Err(e)) => warn!("{} task panicked: {}", name, e),
                Err(_) => warn!("{} did not stop in time", name),
            }
        }
    }

    if let Err(e) = store.flush().await {
        error!("Failed to save store snapshot: {}", e);
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
