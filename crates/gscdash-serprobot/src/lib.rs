//! Client for the SerpRobot rank-tracking API.

pub mod client;
pub mod error;
pub mod types;

pub use client::SerpRobotClient;
pub use error::SerpRobotError;
pub use types::{avg_rank_delta, parse_project, KeywordData, TrackedKeyword};
