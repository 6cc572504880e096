//! Text rendering of subscription state.

use bingo_sdk::types::game::is_finished;
use bingo_sdk::{LeaderboardSnapshot, SubscriptionState};

/// Formats the top `n` leaderboard rows as `#rank nickname points`.
///
/// Rows without a server rank are numbered by position.
#[must_use]
pub fn leaderboard_lines(snapshot: &LeaderboardSnapshot, n: usize) -> Vec<String> {
    snapshot
        .top(n)
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let rank = entry.rank.map_or(index + 1, |rank| rank as usize);
            format!("#{} {} {}", rank, entry.nickname, entry.points)
        })
        .collect()
}

/// One-line summary of connectivity and game status.
#[must_use]
pub fn status_line(state: &SubscriptionState) -> String {
    let connectivity = if state.is_connected {
        "connected"
    } else {
        "disconnected"
    };
    let players = state
        .leaderboard
        .as_ref()
        .map_or(0, |snapshot| snapshot.total_players);

    format!(
        "{} phase={} status={} players={}",
        connectivity,
        state.phase,
        state.game_status.as_deref().unwrap_or("unknown"),
        players
    )
}

/// Lines worth logging for the transition from `previous` to `current`.
#[must_use]
pub fn describe_changes(
    previous: &SubscriptionState,
    current: &SubscriptionState,
    top_n: usize,
) -> Vec<String> {
    let mut lines = Vec::new();

    if previous.is_connected != current.is_connected || previous.phase != current.phase {
        lines.push(status_line(current));
    }

    if previous.game_status != current.game_status {
        if let Some(status) = &current.game_status {
            let suffix = if is_finished(status) { " (finished)" } else { "" };
            lines.push(format!("game status: {}{}", status, suffix));
        }
    }

    if previous.winner != current.winner {
        if let Some(winner) = &current.winner {
            let points = winner
                .points
                .map(|p| format!(" with {} points", p))
                .unwrap_or_default();
            lines.push(format!("winner: {}{}", winner.nickname, points));
        }
    }

    if previous.leaderboard != current.leaderboard {
        if let Some(snapshot) = &current.leaderboard {
            lines.push(format!(
                "leaderboard at {} ({} players)",
                snapshot.timestamp, snapshot.total_players
            ));
            lines.extend(leaderboard_lines(snapshot, top_n));
        }
    }

    if previous.events.latest() != current.events.latest() {
        if let Some(event) = current.events.latest() {
            lines.push(format!("activity: {} at {}", event.event_type, event.timestamp));
        }
    }

    if previous.error != current.error {
        if let Some(error) = &current.error {
            lines.push(format!("error: {}", error));
        }
    }

    lines
}
