//! Leaderboard types for the Buzzword Bingo SDK.
//!
//! Provides the ranked player list pushed by the realtime server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single ranked player on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Player session identifier.
    pub session_id: String,

    /// Display name chosen by the player.
    pub nickname: String,

    /// Total points.
    pub points: i64,

    /// 1-based rank, when the server computed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    /// Number of completed BINGO lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bingo_count: Option<u32>,

    /// Number of marked cells on the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_count: Option<u32>,
}

impl LeaderboardEntry {
    /// Creates a new entry without rank or card statistics.
    #[must_use]
    pub fn new(session_id: impl Into<String>, nickname: impl Into<String>, points: i64) -> Self {
        Self {
            session_id: session_id.into(),
            nickname: nickname.into(),
            points,
            rank: None,
            bingo_count: None,
            marked_count: None,
        }
    }

    /// Sets the rank.
    #[must_use]
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }
}

impl fmt::Display for LeaderboardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            Some(rank) => write!(f, "#{} {} ({} pts)", rank, self.nickname, self.points),
            None => write!(f, "{} ({} pts)", self.nickname, self.points),
        }
    }
}

/// Full leaderboard snapshot for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    /// Game the snapshot belongs to.
    pub game_id: String,

    /// Server timestamp of the snapshot.
    pub timestamp: String,

    /// Total number of players in the game.
    pub total_players: usize,

    /// Ranked entries, best first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl LeaderboardSnapshot {
    /// Builds a snapshot from a `leaderboard_update` payload.
    ///
    /// The server may omit `totalPlayers`; the entry count is used then.
    #[must_use]
    pub fn from_update(
        game_id: String,
        timestamp: String,
        leaderboard: Vec<LeaderboardEntry>,
        total_players: Option<usize>,
    ) -> Self {
        let total_players = total_players.unwrap_or(leaderboard.len());
        Self {
            game_id,
            timestamp,
            total_players,
            leaderboard,
        }
    }

    /// Returns the leading entry.
    #[must_use]
    pub fn leader(&self) -> Option<&LeaderboardEntry> {
        self.leaderboard.first()
    }

    /// Returns the first `n` entries.
    #[must_use]
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        let end = n.min(self.leaderboard.len());
        self.leaderboard.get(..end).unwrap_or_default()
    }

    /// Finds the entry for a player session.
    #[must_use]
    pub fn find_session(&self, session_id: &str) -> Option<&LeaderboardEntry> {
        self.leaderboard
            .iter()
            .find(|entry| entry.session_id == session_id)
    }

    /// Returns true if the leaderboard has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaderboard.is_empty()
    }
}
