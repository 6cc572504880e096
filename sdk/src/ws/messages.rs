//! WebSocket message types.
//!
//! Defines the frames exchanged with the realtime endpoint.

use serde::{Deserialize, Serialize};

use crate::types::{ActivityEvent, LeaderboardEntry, LeaderboardSnapshot, WinnerInfo};

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Returns true if a close code (or its absence) is an abnormal closure.
#[must_use]
pub fn is_abnormal_closure(code: Option<u16>) -> bool {
    code != Some(NORMAL_CLOSURE)
}

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe the socket to a game's realtime feed.
    Subscribe {
        /// Game to subscribe to.
        #[serde(rename = "gameId")]
        game_id: String,
    },
}

impl ClientMessage {
    /// Creates a subscribe handshake.
    #[must_use]
    pub fn subscribe(game_id: impl Into<String>) -> Self {
        Self::Subscribe {
            game_id: game_id.into(),
        }
    }
}

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Full ranked leaderboard snapshot.
    #[serde(rename_all = "camelCase")]
    LeaderboardUpdate {
        /// Game the snapshot belongs to.
        game_id: String,
        /// Ranked entries.
        leaderboard: Vec<LeaderboardEntry>,
        /// Total number of players, if sent.
        #[serde(default)]
        total_players: Option<usize>,
        /// Server timestamp.
        timestamp: String,
    },

    /// A single activity event.
    ActivityEvent {
        /// Event envelope.
        event: ActivityEvent,
    },

    /// Game status transition.
    #[serde(rename_all = "camelCase")]
    GameStateChanged {
        /// Status before the transition.
        #[serde(default)]
        previous_state: Option<String>,
        /// Status after the transition.
        new_state: String,
        /// Winner, when the transition ended the game.
        #[serde(default)]
        winner: Option<WinnerInfo>,
    },

    /// Subscription handshake acknowledgement.
    #[serde(rename_all = "camelCase")]
    Subscribed {
        /// Game the socket is subscribed to.
        #[serde(default)]
        game_id: Option<String>,
    },

    /// Application error reported by the server.
    Error {
        /// Error message.
        message: String,
    },

    /// Synthetic frame emitted by the pool when the socket closes.
    ///
    /// Never decoded from the wire.
    #[serde(skip_deserializing)]
    ConnectionLost {
        /// Close code, if the peer sent one.
        code: Option<u16>,
    },
}

impl InboundFrame {
    /// Returns the wire tag of the frame.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LeaderboardUpdate { .. } => "leaderboard_update",
            Self::ActivityEvent { .. } => "activity_event",
            Self::GameStateChanged { .. } => "game_state_changed",
            Self::Subscribed { .. } => "subscribed",
            Self::Error { .. } => "error",
            Self::ConnectionLost { .. } => "connection_lost",
        }
    }

    /// Converts a `leaderboard_update` frame into a snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Option<LeaderboardSnapshot> {
        match self {
            Self::LeaderboardUpdate {
                game_id,
                leaderboard,
                total_players,
                timestamp,
            } => Some(LeaderboardSnapshot::from_update(
                game_id.clone(),
                timestamp.clone(),
                leaderboard.clone(),
                *total_players,
            )),
            _ => None,
        }
    }
}
