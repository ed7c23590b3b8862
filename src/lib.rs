//! Small habit tracker for the terminal. Habits are marked as done per day, streaks show how many
//! days in a row a habit was kept, and a lightweight daemon reminds about habits that are still
//! incomplete at their reminder time.
//!

pub mod cli;
pub mod daemon;
pub mod registry;
pub mod reminder;
pub mod storage;
pub mod utils;
