//! Append-only run log.
//!
//! Every terminated run appends one block to a plain text file (`logs.txt` by
//! default):
//!
//! ```text
//! ==== Run finished 2024-05-01 14:03:12 ====
//! Total cycles: 100
//! Packet delivery ratio: 99.00% (99/100)
//! Mean latency: 1.00 hops
//! Sensor 0: energy 0.00, drained, neighbors [SINK]
//! Sensor SINK: energy unlimited, sink, neighbors [0]
//! ```

use anyhow::Context;
use chrono::Local;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::simulation::controller::RunSummary;

/// File the GUI appends to when no other path is given.
pub const DEFAULT_RUN_LOG: &str = "logs.txt";

/// Render one run as the text block written to the log.
pub fn format_summary(summary: &RunSummary, timestamp: &str) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "==== Run finished {} ====", timestamp);
    let _ = writeln!(text, "Total cycles: {}", summary.total_cycles);
    let _ = writeln!(
        text,
        "Packet delivery ratio: {:.2}% ({}/{})",
        summary.pdr_percent, summary.packets_delivered, summary.packets_sent
    );
    let _ = writeln!(text, "Mean latency: {:.2} hops", summary.mean_latency_hops);
    for sensor in &summary.sensors {
        let energy = match sensor.final_energy {
            Some(e) => format!("{:.2}", e),
            None => "unlimited".to_string(),
        };
        let _ = writeln!(
            text,
            "Sensor {}: energy {}, {}, neighbors [{}]",
            sensor.label,
            energy,
            sensor.final_class,
            sensor.neighbors.join(", ")
        );
    }
    text.push('\n');
    text
}

/// Append the summary of a terminated run to `path`, creating the file if needed.
pub fn append_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let text = format_summary(summary, &timestamp);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open run log {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write run log {}", path.display()))?;

    log::info!("Run summary appended to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::controller::SensorRecord;
    use crate::simulation::types::FinalClass;
    use std::fs;

    fn summary() -> RunSummary {
        RunSummary {
            total_cycles: 100,
            packets_sent: 100,
            packets_delivered: 99,
            packets_lost: 1,
            pdr_percent: 99.0,
            mean_latency_hops: 1.0,
            sensors: vec![
                SensorRecord {
                    label: "0".to_string(),
                    final_energy: Some(0.0),
                    final_class: FinalClass::Drained,
                    neighbors: vec!["SINK".to_string()],
                },
                SensorRecord {
                    label: "SINK".to_string(),
                    final_energy: None,
                    final_class: FinalClass::Sink,
                    neighbors: vec!["0".to_string()],
                },
            ],
        }
    }

    #[test]
    fn summary_block_lists_every_sensor() {
        let text = format_summary(&summary(), "2024-05-01 14:03:12");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "==== Run finished 2024-05-01 14:03:12 ====");
        assert_eq!(lines[1], "Total cycles: 100");
        assert_eq!(lines[2], "Packet delivery ratio: 99.00% (99/100)");
        assert_eq!(lines[3], "Mean latency: 1.00 hops");
        assert_eq!(lines[4], "Sensor 0: energy 0.00, drained, neighbors [SINK]");
        assert_eq!(lines[5], "Sensor SINK: energy unlimited, sink, neighbors [0]");
    }

    #[test]
    fn runs_are_appended() {
        let path = std::env::temp_dir().join(format!("wsn_run_log_{}.txt", std::process::id()));
        let _ = fs::remove_file(&path);

        append_summary(&path, &summary()).unwrap();
        append_summary(&path, &summary()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("==== Run finished").count(), 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn summary_serializes_to_json() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["total_cycles"], 100);
        assert_eq!(json["sensors"][0]["final_class"], "Drained");
        assert!(json["sensors"][1]["final_energy"].is_null());
    }
}
