//! Buzzword Bingo status board.
//!
//! Follows one game anonymously (or as a player, when a session token is
//! configured) and logs the live leaderboard, activity and game state.
//!
//! # Components
//!
//! - [`config`]: Board configuration from the environment
//! - [`render`]: Text rendering of subscription state

pub mod config;
pub mod render;

pub use config::{BoardConfig, ConfigError};
pub use render::{describe_changes, leaderboard_lines, status_line};
