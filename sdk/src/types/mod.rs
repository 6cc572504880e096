//! Core types for the Buzzword Bingo SDK.
//!
//! This module provides the game data carried by realtime frames.

pub mod activity;
pub mod game;
pub mod leaderboard;

pub use activity::{ActivityEvent, ActivityFeed, DEFAULT_FEED_CAPACITY};
pub use game::WinnerInfo;
pub use leaderboard::{LeaderboardEntry, LeaderboardSnapshot};
