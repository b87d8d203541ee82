//! Relay channel management.
//!
//! Groups the communication channels between the connection wrapper, the
//! overlay router and the overlay output so wiring stays in one place.

use tokio::sync::{mpsc, watch};

use crate::common::types::LiveEvent;
use crate::connection::ConnectionEvent;

/// Senders handed to the connection resilience wrapper.
pub struct ConnectionChannels {
    /// Live chat/gift/poll events from the platform.
    pub live_tx: mpsc::UnboundedSender<LiveEvent>,
    /// Connection lifecycle notifications.
    pub events_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

/// Receivers and output for the overlay router.
pub struct RouterChannels {
    /// Live events to relay.
    pub live_rx: mpsc::UnboundedReceiver<LiveEvent>,
    /// Connection lifecycle notifications to relay as state messages.
    pub events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    /// Serialized overlay messages, one JSON document per entry.
    pub overlay_tx: mpsc::UnboundedSender<String>,
    /// Shutdown signal (router stops when it flips to true).
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Receiver for whatever serves the overlays.
pub struct OverlayChannels {
    pub overlay_rx: mpsc::UnboundedReceiver<String>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created for one relay.
pub struct ChannelBundle {
    pub connection: ConnectionChannels,
    pub router: RouterChannels,
    pub overlay: OverlayChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create the full channel set for platform -> router -> overlay flow.
    pub fn new() -> Self {
        let (live_tx, live_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (overlay_tx, overlay_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            connection: ConnectionChannels { live_tx, events_tx },
            router: RouterChannels {
                live_rx,
                events_rx,
                overlay_tx,
                shutdown_rx,
            },
            overlay: OverlayChannels { overlay_rx },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
