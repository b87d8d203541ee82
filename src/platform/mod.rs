//! Platform-facing connection seam.
//!
//! The resilience wrapper is generic over [`LiveConnection`], the session
//! object for one remote room. The production implementation is
//! [`GatewayConnection`]; tests substitute scripted fakes.

pub mod codec;
pub mod gateway;

use std::future::Future;

use serde::Serialize;

use crate::common::error::ConnectionResult;
use crate::common::types::LiveEvent;

pub use gateway::GatewayConnection;

/// Identifies an established session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// The room/channel being watched.
    pub room_id: String,
    /// Always true for a freshly established session; carried so overlay
    /// consumers get a self-describing payload.
    pub connected: bool,
}

/// An event delivered by the underlying platform connection.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// A live chat/gift/poll/like event from the room.
    Live(LiveEvent),
    /// The broadcast ended gracefully; the room is gone.
    StreamEnded,
    /// The session dropped. `reason` is whatever the platform reported.
    Disconnected { reason: Option<String> },
    /// Recoverable warning. Does not change connection state by itself;
    /// a real drop arrives as `Disconnected`.
    Error(String),
}

/// A session to one external room, exclusively owned by its wrapper.
///
/// `connect` resolves or rejects per the platform's own contract; there is
/// no timeout layered on top of it here.
pub trait LiveConnection: Send + 'static {
    /// Establish the session and return its identity.
    fn connect(&mut self) -> impl Future<Output = ConnectionResult<SessionInfo>> + Send;

    /// Tear down the session. Closing an already-closed session is allowed.
    fn disconnect(&mut self) -> impl Future<Output = ConnectionResult<()>> + Send;

    /// Next pushed event. `None` once the session is closed.
    fn next_event(&mut self) -> impl Future<Output = Option<PlatformEvent>> + Send;
}
