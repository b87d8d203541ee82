//! Live event types shared across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message posted in the watched room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    pub user: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A gift sent to the broadcaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftEvent {
    pub user: String,
    /// Display name of the gift (e.g. "Rose").
    pub gift_name: String,
    /// Repeat count within a combo.
    pub count: u32,
    /// Coin value of a single gift.
    pub coin_value: u32,
    pub timestamp: DateTime<Utc>,
}

/// A vote cast in a chat poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVoteEvent {
    pub user: String,
    pub option: String,
    pub timestamp: DateTime<Utc>,
}

/// A batch of likes from one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeEvent {
    pub user: String,
    pub count: u32,
    pub timestamp: DateTime<Utc>,
}

/// An event pushed by the platform while the room is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiveEvent {
    Chat(ChatEvent),
    Gift(GiftEvent),
    PollVote(PollVoteEvent),
    Like(LikeEvent),
}

impl LiveEvent {
    /// Name of the event kind, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Gift(_) => "gift",
            Self::PollVote(_) => "poll_vote",
            Self::Like(_) => "like",
        }
    }
}
