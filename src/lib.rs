//! Device-side engine for a live trivia treasure hunt.
//!
//! A participant's whole run lives on the device: the phase machine,
//! deterministic question selection, scoring, the dual timers, and the
//! anti-cheat monitor. A shared participant store is polled to reconcile
//! operator edits and to decode the control record that drives pause,
//! blackout, sound cues, and broadcasts.

pub mod anticheat;
pub mod config;
pub mod content;
pub mod control;
pub mod dao;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod scoring;
pub mod state;
pub mod timer;
