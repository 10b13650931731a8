pub mod cache;
pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod leaderboard;
pub mod level;
pub mod scheduler;
pub mod utils;

#[cfg(test)]
mod testing;
