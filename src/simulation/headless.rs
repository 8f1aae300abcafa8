//! Synchronous runner used by `--headless`: no UI, no inter-cycle delay.

use anyhow::{Context, bail};
use std::path::Path;

use crate::common::config::SimulationConfig;
use crate::common::run_log;

use super::controller::{RunSummary, Simulation};

/// Upper bound on cycles for a single headless run.
pub const MAX_HEADLESS_CYCLES: u64 = 1_000_000;

/// Drive `simulation` until it terminates or `max_cycles` have run.
pub fn run_to_completion(simulation: &mut Simulation, max_cycles: u64) -> anyhow::Result<RunSummary> {
    simulation.start()?;
    while simulation.cycle() < max_cycles {
        match simulation.step()? {
            Some(report) if report.terminated => break,
            Some(_) => {}
            None => break,
        }
    }

    match simulation.summary() {
        Some(summary) => Ok(summary.clone()),
        None => bail!("Simulation did not terminate within {} cycles", max_cycles),
    }
}

/// Load `config_path`, run to termination, and append the summary to `log_path`.
pub fn run(config_path: &Path, log_path: &Path) -> anyhow::Result<RunSummary> {
    let config = SimulationConfig::load(config_path).with_context(|| format!("Cannot run {}", config_path.display()))?;

    let mut simulation = Simulation::default();
    simulation.configure(config)?;
    let summary = run_to_completion(&mut simulation, MAX_HEADLESS_CYCLES)?;
    run_log::append_summary(log_path, &summary)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::test_config;
    use std::fs;

    #[test]
    fn cycle_cap_is_reported() {
        let mut simulation = Simulation::default();
        simulation
            .configure(SimulationConfig {
                min_coverage_percent: 0.0,
                failure_prob: 0.0,
                ..test_config()
            })
            .unwrap();
        let err = run_to_completion(&mut simulation, 2).unwrap_err();
        assert!(err.to_string().contains("2 cycles"));
        assert_eq!(simulation.cycle(), 2);
    }

    #[test]
    fn headless_run_appends_the_run_log() {
        let dir = std::env::temp_dir();
        let config_path = dir.join(format!("wsn_headless_{}.toml", std::process::id()));
        let log_path = dir.join(format!("wsn_headless_{}.txt", std::process::id()));
        let _ = fs::remove_file(&log_path);

        let config = SimulationConfig {
            num_points: 8,
            max_sensors: 4,
            initial_energy: 5.0,
            ..test_config()
        };
        config.save(&config_path).unwrap();

        let summary = run(&config_path, &log_path).unwrap();
        assert!(summary.total_cycles > 0);
        assert_eq!(summary.sensors.len(), 5);
        let text = fs::read_to_string(&log_path).unwrap();
        assert!(text.contains(&format!("Total cycles: {}", summary.total_cycles)));

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_file(&log_path);
    }

    #[test]
    fn missing_configuration_file_is_an_error() {
        let err = run(Path::new("/nonexistent/wsn.toml"), Path::new("/nonexistent/logs.txt")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read file"));
    }
}
