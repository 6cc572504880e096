//! Game lifecycle types for the Buzzword Bingo SDK.

use serde::{Deserialize, Serialize};

/// Well-known game status labels sent in `game_state_changed` frames.
///
/// The server treats statuses as open strings; these are the ones the
/// game flow produces today.
pub mod status {
    /// Game created, players joining.
    pub const WAITING: &str = "waiting";
    /// Game running, cards can be marked.
    pub const ACTIVE: &str = "active";
    /// Game paused by an admin.
    pub const PAUSED: &str = "paused";
    /// A winner was confirmed.
    pub const BINGO: &str = "bingo";
    /// Game finished.
    pub const COMPLETE: &str = "complete";
}

/// Descriptor of the player who won a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerInfo {
    /// Winning player session identifier.
    pub session_id: String,

    /// Winning player display name.
    pub nickname: String,

    /// Points at the time of the win.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,

    /// Server timestamp of the win.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub won_at: Option<String>,
}

/// Returns true if `label` is a terminal game status.
#[must_use]
pub fn is_finished(label: &str) -> bool {
    label == status::BINGO || label == status::COMPLETE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_deserialize() {
        let json = r#"{"sessionId":"s1","nickname":"Alice","points":120}"#;
        let winner: WinnerInfo = serde_json::from_str(json).expect("deserialize");
        assert_eq!(winner.nickname, "Alice");
        assert_eq!(winner.points, Some(120));
        assert!(winner.won_at.is_none());
    }

    #[test]
    fn test_is_finished() {
        assert!(is_finished(status::COMPLETE));
        assert!(is_finished(status::BINGO));
        assert!(!is_finished(status::ACTIVE));
        assert!(!is_finished("unknown"));
    }
}
