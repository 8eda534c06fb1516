//! Pure functions over snapshot data: what the UI may offer, how long is
//! left, how players rank. None of these are authoritative; the backend
//! re-checks every action.

pub mod actions;
pub mod activity;
pub mod admin;
pub mod credentials;
pub mod leaderboard;
pub mod mind_games;
pub mod presentation;
pub mod profile;
pub mod suspicion;
pub mod timers;
pub mod whisper;
