//! TCP client for the platform gateway feed.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::common::types::{ChatEvent, GiftEvent, LikeEvent, LiveEvent, PollVoteEvent};
use crate::platform::codec::{EventFrameCodec, WireMessage};
use crate::platform::{LiveConnection, PlatformEvent, SessionInfo};

/// Connection to one room on the gateway.
///
/// Holds no socket until `connect` succeeds; a reconnect attempt on the same
/// instance opens a fresh socket.
pub struct GatewayConnection {
    host: String,
    port: u16,
    room: String,
    framed: Option<Framed<TcpStream, EventFrameCodec>>,
}

impl GatewayConnection {
    pub fn new(host: impl Into<String>, port: u16, room: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            room: room.into(),
            framed: None,
        }
    }

    fn map_wire(&self, message: WireMessage) -> Option<PlatformEvent> {
        let now = Utc::now();
        match message {
            WireMessage::Chat { user, text } => Some(PlatformEvent::Live(LiveEvent::Chat(
                ChatEvent {
                    user,
                    text,
                    timestamp: now,
                },
            ))),
            WireMessage::Gift {
                user,
                gift,
                count,
                coin_value,
            } => Some(PlatformEvent::Live(LiveEvent::Gift(GiftEvent {
                user,
                gift_name: gift,
                count,
                coin_value,
                timestamp: now,
            }))),
            WireMessage::PollVote { user, option } => Some(PlatformEvent::Live(
                LiveEvent::PollVote(PollVoteEvent {
                    user,
                    option,
                    timestamp: now,
                }),
            )),
            WireMessage::Like { user, count } => Some(PlatformEvent::Live(LiveEvent::Like(
                LikeEvent {
                    user,
                    count,
                    timestamp: now,
                },
            ))),
            WireMessage::StreamEnd => Some(PlatformEvent::StreamEnded),
            WireMessage::Error { message } => Some(PlatformEvent::Error(message)),
            WireMessage::Subscribe { .. } | WireMessage::Hello { .. } => {
                warn!(room = %self.room, "unexpected handshake frame mid-stream, ignoring");
                None
            }
            WireMessage::Close { reason } => {
                debug!(room = %self.room, ?reason, "gateway closed the session");
                None // caller drops the socket and reports the disconnect
            }
        }
    }
}

impl LiveConnection for GatewayConnection {
    async fn connect(&mut self) -> ConnectionResult<SessionInfo> {
        // A leftover socket from a dropped session is discarded.
        self.framed = None;

        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| ConnectionError::ConnectFailed {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        let mut framed = Framed::new(stream, EventFrameCodec::new());

        framed
            .send(WireMessage::Subscribe {
                room: self.room.clone(),
            })
            .await?;

        match framed.next().await {
            Some(Ok(WireMessage::Hello { room, session_id })) => {
                debug!(%room, %session_id, "gateway session established");
                self.framed = Some(framed);
                Ok(SessionInfo {
                    room_id: room,
                    connected: true,
                })
            }
            Some(Ok(WireMessage::Error { message })) => {
                Err(ConnectionError::Rejected { message })
            }
            Some(Ok(other)) => Err(ConnectionError::Protocol {
                message: format!("expected hello, got {:?}", other),
            }),
            Some(Err(e)) => Err(ConnectionError::Io(e)),
            None => Err(ConnectionError::ConnectionClosed),
        }
    }

    async fn disconnect(&mut self) -> ConnectionResult<()> {
        match self.framed.take() {
            Some(mut framed) => {
                framed
                    .send(WireMessage::Close { reason: None })
                    .await
                    .ok(); // remote may already be gone
                framed.close().await.map_err(ConnectionError::Io)
            }
            None => Ok(()),
        }
    }

    async fn next_event(&mut self) -> Option<PlatformEvent> {
        loop {
            let framed = self.framed.as_mut()?;
            match framed.next().await {
                Some(Ok(message)) => {
                    let is_close = matches!(message, WireMessage::Close { .. });
                    let reason = match &message {
                        WireMessage::Close { reason } => reason.clone(),
                        _ => None,
                    };
                    match self.map_wire(message) {
                        Some(event) => return Some(event),
                        None if is_close => {
                            self.framed = None;
                            return Some(PlatformEvent::Disconnected { reason });
                        }
                        None => continue,
                    }
                }
                Some(Err(e)) => {
                    self.framed = None;
                    return Some(PlatformEvent::Disconnected {
                        reason: Some(e.to_string()),
                    });
                }
                None => {
                    self.framed = None;
                    return Some(PlatformEvent::Disconnected { reason: None });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn spawn_gateway(
        script: Vec<WireMessage>,
    ) -> (String, u16, tokio::task::JoinHandle<Option<WireMessage>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, EventFrameCodec::new());
            let subscribe = framed.next().await.unwrap().unwrap();
            for message in script {
                framed.send(message).await.unwrap();
            }
            Some(subscribe)
        });
        (addr.ip().to_string(), addr.port(), handle)
    }

    #[tokio::test]
    async fn test_handshake_and_event_mapping() {
        let (host, port, server) = spawn_gateway(vec![
            WireMessage::Hello {
                room: "lobby".to_string(),
                session_id: "s-1".to_string(),
            },
            WireMessage::Chat {
                user: "ada".to_string(),
                text: "hi".to_string(),
            },
            WireMessage::Gift {
                user: "bob".to_string(),
                gift: "Rose".to_string(),
                count: 3,
                coin_value: 1,
            },
            WireMessage::StreamEnd,
        ])
        .await;

        let mut conn = GatewayConnection::new(host, port, "lobby");
        let info = conn.connect().await.unwrap();
        assert_eq!(info.room_id, "lobby");
        assert!(info.connected);

        let subscribe = server.await.unwrap().unwrap();
        assert_eq!(
            subscribe,
            WireMessage::Subscribe {
                room: "lobby".to_string()
            }
        );

        match conn.next_event().await.unwrap() {
            PlatformEvent::Live(LiveEvent::Chat(chat)) => {
                assert_eq!(chat.user, "ada");
                assert_eq!(chat.text, "hi");
            }
            other => panic!("expected chat, got {:?}", other),
        }
        match conn.next_event().await.unwrap() {
            PlatformEvent::Live(LiveEvent::Gift(gift)) => {
                assert_eq!(gift.gift_name, "Rose");
                assert_eq!(gift.count, 3);
            }
            other => panic!("expected gift, got {:?}", other),
        }
        assert!(matches!(
            conn.next_event().await.unwrap(),
            PlatformEvent::StreamEnded
        ));

        // Server script is done; the closed socket surfaces as a disconnect.
        assert!(matches!(
            conn.next_event().await.unwrap(),
            PlatformEvent::Disconnected { .. }
        ));
        assert!(conn.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_subscription() {
        let (host, port, _server) = spawn_gateway(vec![WireMessage::Error {
            message: "room offline".to_string(),
        }])
        .await;

        let mut conn = GatewayConnection::new(host, port, "lobby");
        match conn.connect().await {
            Err(ConnectionError::Rejected { message }) => {
                assert_eq!(message, "room offline");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on this port once the listener is dropped.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut conn = GatewayConnection::new(addr.ip().to_string(), addr.port(), "lobby");
        assert!(matches!(
            conn.connect().await,
            Err(ConnectionError::ConnectFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_ok() {
        let mut conn = GatewayConnection::new("127.0.0.1", 1, "lobby");
        conn.disconnect().await.unwrap();
        conn.disconnect().await.unwrap();
    }
}
