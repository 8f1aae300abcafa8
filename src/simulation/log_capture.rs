//! Log capture feeding the UI event log.
//!
//! The controller prefixes every per-cycle message with the cycle number,
//! e.g. `[42] Sensor 7 failed`. [`TeeLogger`] forwards each record to the
//! regular `env_logger` output and additionally copies those cycle-tagged
//! records from the simulation modules into a bounded global buffer. The UI
//! drains the buffer once per frame.

use chrono::{DateTime, Local};
use log::{Level, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum number of log entries to buffer before they're consumed.
const LOG_BUFFER_CAPACITY: usize = 10000;

/// Only records from these modules are captured.
const CAPTURED_MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::simulation");

/// A captured log entry with the extracted cycle number.
#[derive(Debug, Clone)]
pub struct CapturedLogEntry {
    pub cycle: u64,
    pub timestamp: DateTime<Local>,
    pub content: String,
    pub level: Level,
}

/// Global buffer for captured log entries.
static CAPTURED_LOGS: Mutex<Option<VecDeque<CapturedLogEntry>>> = Mutex::new(None);

/// Initialize the log capture buffer.
pub fn init_log_capture() {
    if let Ok(mut guard) = CAPTURED_LOGS.lock() {
        *guard = Some(VecDeque::with_capacity(LOG_BUFFER_CAPACITY));
    }
}

/// Drain all captured log entries from the buffer.
pub fn drain_captured_logs() -> Vec<CapturedLogEntry> {
    match CAPTURED_LOGS.lock() {
        Ok(mut guard) => guard.as_mut().map(|buffer| buffer.drain(..).collect()).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

fn push_log_entry(entry: CapturedLogEntry) {
    if let Ok(mut guard) = CAPTURED_LOGS.lock() {
        if let Some(buffer) = guard.as_mut() {
            if buffer.len() >= LOG_BUFFER_CAPACITY {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }
}

/// Split `[N] rest` into `(N, rest)`.
fn extract_cycle(message: &str) -> Option<(u64, &str)> {
    let trimmed = message.trim_start();
    let inner = trimmed.strip_prefix('[')?;
    let end_bracket = inner.find(']')?;
    let cycle: u64 = inner[..end_bracket].parse().ok()?;
    Some((cycle, inner[end_bracket + 1..].trim_start()))
}

/// Whether a record from `module` is eligible for capture.
fn is_captured_module(module: &str) -> bool {
    module.starts_with(CAPTURED_MODULE_PREFIX)
}

/// A tee logger that forwards to `env_logger` and captures cycle-tagged simulation logs.
pub struct TeeLogger {
    inner: env_logger::Logger,
}

impl TeeLogger {
    pub fn new(inner: env_logger::Logger) -> Self {
        Self { inner }
    }

    /// Get the maximum log level filter from the inner logger.
    pub fn filter(&self) -> log::LevelFilter {
        self.inner.filter()
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.inner.log(record);

        if !self.inner.matches(record) {
            return;
        }
        if let Some(module) = record.module_path() {
            if is_captured_module(module) {
                let message = format!("{}", record.args());
                if let Some((cycle, content)) = extract_cycle(&message) {
                    push_log_entry(CapturedLogEntry {
                        cycle,
                        timestamp: Local::now(),
                        content: content.to_string(),
                        level: record.level(),
                    });
                }
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cycle() {
        assert_eq!(extract_cycle("[49] Sensor 3 failed"), Some((49, "Sensor 3 failed")));
        assert_eq!(extract_cycle("[1] Test"), Some((1, "Test")));
        assert_eq!(extract_cycle("[123] "), Some((123, "")));
        assert_eq!(extract_cycle("No bracket"), None);
        assert_eq!(extract_cycle("[abc] Not a number"), None);
        assert_eq!(extract_cycle("[-1] Negative"), None);
    }

    #[test]
    fn only_simulation_modules_are_captured() {
        assert!(is_captured_module("wsn_coverage_simulator::simulation::controller"));
        assert!(!is_captured_module("wsn_coverage_simulator::ui::app_state"));
        assert!(!is_captured_module("good_lp::solvers"));
    }

    #[test]
    fn buffer_drops_oldest_entries_when_full() {
        init_log_capture();
        for cycle in 0..(LOG_BUFFER_CAPACITY as u64 + 5) {
            push_log_entry(CapturedLogEntry {
                cycle,
                timestamp: Local::now(),
                content: String::new(),
                level: Level::Info,
            });
        }
        let drained = drain_captured_logs();
        assert_eq!(drained.len(), LOG_BUFFER_CAPACITY);
        assert_eq!(drained[0].cycle, 5);
        assert!(drain_captured_logs().is_empty());
    }
}
