//! Shared configuration and persistence helpers used by both the GUI and the
//! headless runner.

pub mod config;
pub mod run_log;
