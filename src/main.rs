//! Marquee - live-stream overlay relay
//!
//! Connects to a streaming-platform gateway, keeps the session alive
//! across drops, and relays chat/gift/poll events to browser overlays.

mod common;
mod config;
mod connection;
mod platform;
mod relay;

use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use tokio::signal;
use tracing::{debug, error, info, warn};

use config::env::get_config_path;
use config::load_and_validate;
use connection::ResilientConnection;
use platform::GatewayConnection;
use relay::{ChannelBundle, EventFilter};

/// Exponential backoff for rebuilding the session after terminal failures.
/// 5s initial, 5min max, with jitter, unlimited retries.
fn relay_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(2.0)
        .with_jitter()
        .without_max_times()
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Marquee v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        e
    })?;

    info!("Configuration loaded successfully");
    info!(
        "  Gateway: {}:{}",
        config.platform.host, config.platform.port
    );
    info!("  Room: {}", config.platform.room);

    // ============================================================
    // Create channels and relay tasks
    // ============================================================

    let bundle = ChannelBundle::new();
    let shutdown_tx = bundle.control.shutdown_tx;
    let mut relay_shutdown_rx = shutdown_tx.subscribe();

    // Router: live + connection events -> overlay feed
    let filter = EventFilter::new(config.chat_filter_patterns(), config.min_gift_value());
    let router_task = relay::spawn_router(filter, bundle.router);

    // Overlay sink: one JSON document per line on stdout; the presentation
    // server consumes this feed.
    let sink_task = {
        let mut overlay_rx = bundle.overlay.overlay_rx;
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let mut out = tokio::io::stdout();
            while let Some(line) = overlay_rx.recv().await {
                if out.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if out.write_all(b"\n").await.is_err() {
                    break;
                }
                let _ = out.flush().await;
            }
            info!("Overlay sink ended");
        })
    };

    // ============================================================
    // Session supervision
    // ============================================================

    // A terminal wrapper failure (unstable drop, exhausted reconnects,
    // stream end) builds a fresh wrapper after a backoff delay.
    let connection_channels = bundle.connection;
    let policy = config.reconnect_policy();
    let platform_cfg = config.platform.clone();

    let mut relay_task = tokio::spawn(async move {
        let mut backoff = relay_backoff();

        loop {
            // Check for shutdown before connecting
            if relay_shutdown_rx.has_changed().unwrap_or(false) && *relay_shutdown_rx.borrow() {
                info!("Shutdown signal detected, stopping session supervision");
                break;
            }

            let gateway = GatewayConnection::new(
                platform_cfg.host.clone(),
                platform_cfg.port,
                platform_cfg.room.clone(),
            );
            let mut session = ResilientConnection::new(
                gateway,
                platform_cfg.room.clone(),
                policy.clone(),
                connection_channels.events_tx.clone(),
                connection_channels.live_tx.clone(),
            );
            let handle = session.handle();

            match session.connect().await {
                Ok(info) => {
                    info!("Watching room {}", info.room_id);
                    backoff = relay_backoff(); // Reset backoff on successful connection

                    let mut run = pin!(session.run());
                    tokio::select! {
                        _ = &mut run => {
                            info!("Session ended");
                        }
                        _ = relay_shutdown_rx.changed() => {
                            if *relay_shutdown_rx.borrow() {
                                handle.disconnect();
                                run.await;
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to connect: {}", e);
                }
            }

            // Calculate backoff delay
            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            info!("Rebuilding session in {:.1} seconds...", delay.as_secs_f64());

            // Wait for delay OR shutdown signal
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = relay_shutdown_rx.changed() => {
                    if *relay_shutdown_rx.borrow() {
                        info!("Shutdown signal received during backoff");
                        break;
                    }
                }
            }
        }
    });

    // ============================================================
    // Run until a task ends or a signal arrives
    // ============================================================
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - closing session...");
            true
        }
        _ = &mut relay_task => false,
        _ = router_task => false,
        _ = sink_task => false,
    };

    // Handle graceful shutdown
    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (relay already exited): {}", e);
        }
        let timeout = Duration::from_secs(5);
        match tokio::time::timeout(timeout, relay_task).await {
            Ok(Ok(())) => info!("Session closed gracefully"),
            Ok(Err(e)) => warn!("Relay task panicked: {}", e),
            Err(_) => warn!("Session close timed out"),
        }
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
