//! Connection resilience wrapper.
//!
//! Owns one [`LiveConnection`] and keeps it alive across mid-session drops:
//!
//! - a drop within 3 s of connecting is judged a failed connect (auth loops,
//!   dead rooms) and reported upward immediately, never retried;
//! - a drop after a stable run enters the reconnect scheduler, which doubles
//!   its delay per attempt up to the policy maximum and gives up after the
//!   attempt ceiling;
//! - a connection that stays up for 10 s forgives past failures, restoring
//!   the full backoff budget.
//!
//! Initial connect failures are returned to the caller and never retried
//! here; reconnection only ever recovers an established session. The whole
//! wrapper runs on one task (`run`), so state mutations never race; the
//! cloneable [`ConnectionHandle`] only flips the client-disconnect latch and
//! wakes the task.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::common::reconnect::{
    ReconnectPolicy, RetrySchedule, MIN_STABLE_CONNECTION, STABILITY_RESET_WINDOW,
};
use crate::common::types::LiveEvent;
use crate::platform::{LiveConnection, PlatformEvent, SessionInfo};

/// Connection lifecycle notifications for overlay consumers.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// First successful connection of this wrapper.
    Connected(SessionInfo),
    /// Successful reconnection after a mid-session drop.
    Reconnected(SessionInfo),
    /// Terminal or judged-unstable disconnect. No automatic action follows.
    Disconnected { reason: String },
}

/// Reconnect scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryPhase {
    Idle,
    Scheduled,
    Attempting,
    Exhausted,
}

#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    client_disconnect: AtomicBool,
    closed: Notify,
}

/// Cloneable control surface for a wrapper.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    /// Permanently disconnect this wrapper. Idempotent; the latch cannot be
    /// unset, and no further events fire once it is observed.
    pub fn disconnect(&self) {
        if !self.shared.client_disconnect.swap(true, Ordering::SeqCst) {
            self.shared.closed.notify_one();
        }
    }

    /// True iff the session is live and the client has not disconnected.
    #[allow(dead_code)]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
            && !self.shared.client_disconnect.load(Ordering::SeqCst)
    }
}

/// Resilience wrapper around one platform session.
pub struct ResilientConnection<C> {
    inner: C,
    room: String,
    schedule: RetrySchedule,
    /// Cleared permanently when the broadcast ends or policy disables it.
    reconnect_enabled: bool,
    stream_ended: bool,
    shared: Arc<Shared>,
    connected_at: Option<Instant>,
    phase: RetryPhase,
    /// At most one pending reconnect timer.
    retry_timer: Option<Pin<Box<Sleep>>>,
    retry_reason: Option<String>,
    /// At most one pending stability-reset timer.
    reset_timer: Option<Pin<Box<Sleep>>>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    live_tx: mpsc::UnboundedSender<LiveEvent>,
}

impl<C: LiveConnection> ResilientConnection<C> {
    pub fn new(
        inner: C,
        room: impl Into<String>,
        policy: ReconnectPolicy,
        events_tx: mpsc::UnboundedSender<ConnectionEvent>,
        live_tx: mpsc::UnboundedSender<LiveEvent>,
    ) -> Self {
        let reconnect_enabled = policy.enabled;
        Self {
            inner,
            room: room.into(),
            schedule: RetrySchedule::new(policy),
            reconnect_enabled,
            stream_ended: false,
            shared: Arc::new(Shared::default()),
            connected_at: None,
            phase: RetryPhase::Idle,
            retry_timer: None,
            retry_reason: None,
            reset_timer: None,
            events_tx,
            live_tx,
        }
    }

    /// Control surface usable from other tasks.
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            shared: self.shared.clone(),
        }
    }

    /// Establish the initial connection.
    ///
    /// On success the session is marked connected, the stability-reset
    /// window is armed and a `Connected` event is emitted. On failure the
    /// error is emitted as `Disconnected` and returned; the wrapper never
    /// retries an initial connect. Call [`run`](Self::run) after a
    /// successful connect to drive resilience.
    pub async fn connect(&mut self) -> ConnectionResult<SessionInfo> {
        if self.client_disconnected() {
            return Err(ConnectionError::ClosedByClient);
        }

        info!(room = %self.room, "connecting");
        let result = self.inner.connect().await;

        if self.client_disconnected() {
            // disconnect() arrived while the connect was in flight; tear
            // down whatever was just opened instead of leaking it.
            if result.is_ok() {
                if let Err(e) = self.inner.disconnect().await {
                    debug!(room = %self.room, error = %e, "teardown of raced connect");
                }
            }
            return Err(ConnectionError::ClosedByClient);
        }

        match result {
            Ok(info) => {
                self.mark_connected();
                info!(room = %info.room_id, "connected");
                self.emit(ConnectionEvent::Connected(info.clone()));
                Ok(info)
            }
            Err(err) => {
                warn!(room = %self.room, error = %err, "initial connect failed");
                self.emit(ConnectionEvent::Disconnected {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Drive the session until a terminal condition: client disconnect,
    /// unstable drop, exhausted reconnect attempts, or a drop with
    /// reconnection disabled.
    pub async fn run(mut self) {
        loop {
            if self.client_disconnected() {
                self.teardown().await;
                return;
            }

            let live = self.connected_at.is_some();
            tokio::select! {
                event = self.inner.next_event(), if live => {
                    if self.handle_platform_event(event).is_break() {
                        return;
                    }
                }

                _ = self.shared.closed.notified() => {
                    // latch is checked at the top of the loop
                }

                _ = async { self.reset_timer.as_mut().unwrap().as_mut().await },
                    if self.reset_timer.is_some() => {
                    self.reset_timer = None;
                    self.schedule.reset();
                    debug!(room = %self.room, "connection stable, backoff budget restored");
                }

                _ = async { self.retry_timer.as_mut().unwrap().as_mut().await },
                    if self.retry_timer.is_some() => {
                    if self.fire_retry().await.is_break() {
                        return;
                    }
                }
            }
        }
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    fn handle_platform_event(&mut self, event: Option<PlatformEvent>) -> ControlFlow<()> {
        match event {
            Some(PlatformEvent::Live(live)) => {
                if let Err(e) = self.live_tx.send(live) {
                    debug!(room = %self.room, error = %e, "live event receiver gone");
                }
                ControlFlow::Continue(())
            }
            Some(PlatformEvent::StreamEnded) => {
                info!(room = %self.room, "stream ended, reconnection disabled");
                self.stream_ended = true;
                self.reconnect_enabled = false;
                ControlFlow::Continue(())
            }
            Some(PlatformEvent::Error(message)) => {
                // Recoverable warnings; a real drop arrives separately.
                warn!(room = %self.room, %message, "platform error");
                ControlFlow::Continue(())
            }
            Some(PlatformEvent::Disconnected { reason }) => self.on_drop(reason),
            None => self.on_drop(None),
        }
    }

    /// The underlying session dropped mid-stream.
    fn on_drop(&mut self, reason: Option<String>) -> ControlFlow<()> {
        let lifetime = self
            .connected_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        self.connected_at = None;
        self.shared.connected.store(false, Ordering::SeqCst);
        // The connection was not stable, so any scheduled counter reset is
        // stale and must not fire.
        self.reset_timer = None;

        if lifetime < MIN_STABLE_CONNECTION && !self.client_disconnected() {
            // Never really connected (auth failures, dead rooms). Retrying
            // would loop rapid-fire, so report the failure instead.
            let detail = reason.unwrap_or_else(|| "connection closed".to_string());
            let reason = format!(
                "connection failed: {} after {}ms",
                detail,
                lifetime.as_millis()
            );
            warn!(room = %self.room, %reason, "unstable drop, not retrying");
            self.emit(ConnectionEvent::Disconnected { reason });
            return ControlFlow::Break(());
        }

        info!(room = %self.room, connected_for = ?lifetime, "connection dropped");
        self.schedule_retry(reason)
    }

    // ========================================================================
    // Reconnect scheduler
    // ========================================================================

    fn reconnect_allowed(&self) -> bool {
        self.reconnect_enabled && !self.client_disconnected()
    }

    fn schedule_retry(&mut self, reason: Option<String>) -> ControlFlow<()> {
        if !self.reconnect_allowed() {
            if self.client_disconnected() {
                // Loop top performs the silent teardown.
                return ControlFlow::Continue(());
            }
            self.phase = RetryPhase::Idle;
            let reason = reason.unwrap_or_else(|| {
                if self.stream_ended {
                    "Stream ended".to_string()
                } else {
                    "Reconnect disabled".to_string()
                }
            });
            self.emit(ConnectionEvent::Disconnected { reason });
            return ControlFlow::Break(());
        }

        if self.schedule.exhausted() {
            return self.give_up(reason);
        }

        let delay = self.schedule.current_delay();
        info!(
            room = %self.room,
            attempt = self.schedule.attempts() + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        self.retry_reason = reason;
        self.retry_timer = Some(Box::pin(sleep(delay)));
        self.phase = RetryPhase::Scheduled;
        ControlFlow::Continue(())
    }

    async fn fire_retry(&mut self) -> ControlFlow<()> {
        debug!(room = %self.room, phase = ?self.phase, "reconnect timer fired");
        self.retry_timer = None;
        let reason = self.retry_reason.take();

        // Conditions may have changed while the timer was pending; the
        // schedule-time check must not be trusted here.
        if !self.reconnect_allowed() {
            self.phase = RetryPhase::Idle;
            return self.schedule_retry(reason);
        }
        if self.schedule.exhausted() {
            return self.give_up(reason);
        }

        self.schedule.advance();
        let attempt = self.schedule.attempts();
        self.phase = RetryPhase::Attempting;
        info!(room = %self.room, attempt, "reconnect attempt");

        let result = self.inner.connect().await;

        if self.client_disconnected() {
            // disconnect() raced the attempt; drop whatever was just opened.
            if result.is_ok() {
                if let Err(e) = self.inner.disconnect().await {
                    debug!(room = %self.room, error = %e, "teardown of raced reconnect");
                }
            }
            return ControlFlow::Continue(());
        }

        match result {
            Ok(info) => {
                self.mark_connected();
                self.phase = RetryPhase::Idle;
                info!(room = %self.room, attempt, "reconnected");
                self.emit(ConnectionEvent::Reconnected(info));
                ControlFlow::Continue(())
            }
            Err(err) => {
                warn!(room = %self.room, attempt, error = %err, "reconnect attempt failed");
                self.phase = RetryPhase::Idle;
                self.schedule_retry(Some(err.to_string()))
            }
        }
    }

    fn give_up(&mut self, reason: Option<String>) -> ControlFlow<()> {
        self.phase = RetryPhase::Exhausted;
        self.retry_timer = None;
        self.retry_reason = None;
        let reason = format!(
            "Connection lost. {}",
            reason.unwrap_or_else(|| format!(
                "Gave up after {} reconnect attempts",
                self.schedule.attempts()
            ))
        );
        warn!(room = %self.room, %reason, "reconnect attempts exhausted");
        self.emit(ConnectionEvent::Disconnected { reason });
        ControlFlow::Break(())
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn mark_connected(&mut self) {
        self.connected_at = Some(Instant::now());
        self.shared.connected.store(true, Ordering::SeqCst);
        // A run that survives the grace window forgives past failures.
        self.reset_timer = Some(Box::pin(sleep(STABILITY_RESET_WINDOW)));
    }

    fn client_disconnected(&self) -> bool {
        self.shared.client_disconnect.load(Ordering::SeqCst)
    }

    async fn teardown(&mut self) {
        self.retry_timer = None;
        self.reset_timer = None;
        self.retry_reason = None;
        self.connected_at = None;
        self.shared.connected.store(false, Ordering::SeqCst);
        // Best effort; an already-closed session is not an error here.
        if let Err(e) = self.inner.disconnect().await {
            debug!(room = %self.room, error = %e, "underlying disconnect during client teardown");
        }
        info!(room = %self.room, "connection closed by client");
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Err(e) = self.events_tx.send(event) {
            debug!(room = %self.room, error = %e, "connection event receiver gone");
        }
    }
}
