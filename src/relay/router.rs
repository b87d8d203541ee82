//! Overlay router.
//!
//! Consumes live events and connection notifications, applies the event
//! filter and forwards serialized overlay messages to whatever serves the
//! browser overlays.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::types::LiveEvent;
use crate::connection::ConnectionEvent;
use crate::relay::channels::RouterChannels;
use crate::relay::filter::EventFilter;

/// Connection status as shown to overlays.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStatus {
    Connected,
    Reconnected,
    Disconnected,
}

/// One message on the overlay feed.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayMessage {
    Event { event: LiveEvent },
    State {
        status: OverlayStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Routes platform output to the overlay feed.
pub struct RelayRouter {
    filter: EventFilter,
    channels: RouterChannels,
}

impl RelayRouter {
    pub fn new(filter: EventFilter, channels: RouterChannels) -> Self {
        Self { filter, channels }
    }

    /// Run until shutdown is signalled or all inputs close.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.channels.live_rx.recv() => {
                    match event {
                        Some(event) => self.handle_live(event),
                        None => break,
                    }
                }

                event = self.channels.events_rx.recv() => {
                    match event {
                        Some(event) => self.handle_connection_event(event),
                        None => break,
                    }
                }

                _ = self.channels.shutdown_rx.changed() => {
                    if *self.channels.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Overlay router stopped");
    }

    fn handle_live(&mut self, event: LiveEvent) {
        if self.filter.should_drop(&event) {
            debug!(kind = event.kind(), "live event filtered");
            return;
        }
        self.forward(&OverlayMessage::Event { event });
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        let message = match event {
            ConnectionEvent::Connected(info) => OverlayMessage::State {
                status: OverlayStatus::Connected,
                room_id: Some(info.room_id),
                reason: None,
            },
            ConnectionEvent::Reconnected(info) => OverlayMessage::State {
                status: OverlayStatus::Reconnected,
                room_id: Some(info.room_id),
                reason: None,
            },
            ConnectionEvent::Disconnected { reason } => OverlayMessage::State {
                status: OverlayStatus::Disconnected,
                room_id: None,
                reason: Some(reason),
            },
        };
        self.forward(&message);
    }

    fn forward(&mut self, message: &OverlayMessage) {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize overlay message: {}", e);
                return;
            }
        };
        if let Err(e) = self.channels.overlay_tx.send(json) {
            warn!("Failed to forward overlay message: {}", e);
        }
    }
}

/// Convenience for wiring: spawn the router onto the runtime.
pub fn spawn_router(
    filter: EventFilter,
    channels: RouterChannels,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(RelayRouter::new(filter, channels).run())
}
