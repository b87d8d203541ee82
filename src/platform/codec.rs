//! Wire framing for the gateway feed.
//!
//! The gateway speaks newline-delimited JSON: one [`WireMessage`] per line.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on a single frame. Anything longer is a protocol violation.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// A message on the gateway wire, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Client -> gateway: watch a room.
    Subscribe { room: String },
    /// Gateway -> client: subscription accepted.
    Hello { room: String, session_id: String },
    Chat {
        user: String,
        text: String,
    },
    Gift {
        user: String,
        gift: String,
        count: u32,
        coin_value: u32,
    },
    PollVote {
        user: String,
        option: String,
    },
    Like {
        user: String,
        count: u32,
    },
    /// The broadcast ended gracefully.
    StreamEnd,
    /// Gateway is closing the session.
    Close { reason: Option<String> },
    /// Warning or rejection, depending on when it arrives.
    Error { message: String },
}

/// Codec for newline-delimited JSON frames.
#[derive(Debug, Default)]
pub struct EventFrameCodec {
    /// Index up to which we already scanned for a newline.
    scanned: usize,
}

impl EventFrameCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for EventFrameCodec {
    type Item = WireMessage;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireMessage>, Self::Error> {
        loop {
            if let Some(pos) = src[self.scanned..].iter().position(|&b| b == b'\n') {
                let line = src.split_to(self.scanned + pos + 1);
                self.scanned = 0;
                let line = &line[..line.len() - 1];
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }
                let message = serde_json::from_slice(line).map_err(|e| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("malformed gateway frame: {}", e),
                    )
                })?;
                return Ok(Some(message));
            }

            self.scanned = src.len();
            if src.len() > MAX_FRAME_LEN {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("gateway frame exceeds {} bytes", MAX_FRAME_LEN),
                ));
            }
            return Ok(None);
        }
    }
}

impl Encoder<WireMessage> for EventFrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: WireMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_frame() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::from(
            &br#"{"type":"chat","user":"ada","text":"hello"}
"#[..],
        );
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            msg,
            WireMessage::Chat {
                user: "ada".to_string(),
                text: "hello".to_string(),
            }
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_newline() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::from(&br#"{"type":"stream_end"#[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\"}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap(),
            WireMessage::StreamEnd
        );
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::from(&b"\n  \n{\"type\":\"stream_end\"}\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap(),
            WireMessage::StreamEnd
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::from(&b"not json\n"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::new();
        buf.resize(MAX_FRAME_LEN + 1, b'x');
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = EventFrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(
                WireMessage::Subscribe {
                    room: "r1".to_string(),
                },
                &mut buf,
            )
            .unwrap();
        assert!(buf.ends_with(b"\n"));
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            decoded,
            WireMessage::Subscribe {
                room: "r1".to_string()
            }
        );
    }
}
