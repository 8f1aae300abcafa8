//! Simulation configuration loading, validation and editing.
//!
//! The configuration is a TOML file with a single `[PARAMS]` table:
//!
//! ```toml
//! [PARAMS]
//! FIELD_WIDTH = 100
//! FIELD_HEIGHT = 100
//! NUM_POINTS = 60
//! MAX_SENSORS = 36
//! COVERAGE_RADIUS = 15.0
//! INITIAL_ENERGY = 100.0
//! MIN_COVERAGE_PERCENT = 80.0
//! TX_COST = 1.0
//! RX_COST = 0.5
//! IDLE_COST = 0.1
//! SLEEP_COST = 0.05
//! SEED = -1
//! FAILURE_PROB = 0.01
//! PACKET_LOSS_PROB = 0.05
//! FREQUENCY = 500
//! ```
//!
//! `SEED`, `FAILURE_PROB`, `PACKET_LOSS_PROB` and `FREQUENCY` are optional.
//! The configuration is an explicit value handed to the cycle controller; there
//! is no process-wide "current configuration".

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::simulation::geometry::distinct_coordinate_count;

/// Communication range as a multiple of the coverage radius.
pub const COMMUNICATION_RANGE_FACTOR: f64 = 1.5;

/// `SEED` value meaning "seed from OS entropy".
pub const UNSEEDED: i64 = -1;

/// Error type for configuration loading failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse configuration: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_seed() -> i64 {
    UNSEEDED
}

fn default_failure_prob() -> f64 {
    0.01
}

fn default_packet_loss_prob() -> f64 {
    0.05
}

fn default_frequency() -> u64 {
    500
}

/// Validated parameter bundle for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SimulationConfig {
    pub field_width: u32,
    pub field_height: u32,
    pub num_points: usize,
    pub max_sensors: usize,
    pub coverage_radius: f64,
    pub initial_energy: f64,
    pub min_coverage_percent: f64,
    pub tx_cost: f64,
    pub rx_cost: f64,
    /// Accepted for compatibility with existing configuration files; the cycle
    /// algorithm does not charge it.
    pub idle_cost: f64,
    pub sleep_cost: f64,
    /// RNG seed, `-1` for an unseeded run.
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_failure_prob")]
    pub failure_prob: f64,
    #[serde(default = "default_packet_loss_prob")]
    pub packet_loss_prob: f64,
    /// Delay between cycles in milliseconds.
    #[serde(default = "default_frequency")]
    pub frequency: u64,
}

/// On-disk layout: everything lives in the `[PARAMS]` table.
#[derive(Serialize, Deserialize)]
struct ConfigFile {
    #[serde(rename = "PARAMS")]
    params: SimulationConfig,
}

impl SimulationConfig {
    /// Load, parse and validate a configuration file.
    ///
    /// # Parameters
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The validated configuration or a `ConfigError` describing the first problem.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
            .map_err(|e| ConfigError::FileReadError(format!("{:#}", e)))?;

        Self::from_toml_str(&data)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(data).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        file.params.validate().map_err(ConfigError::ValidationError)?;
        Ok(file.params)
    }

    /// Serialize into the `[PARAMS]` file layout.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(&ConfigFile { params: self.clone() }).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Write the configuration to `path` in the `[PARAMS]` layout.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = self.to_toml_string()?;
        fs::write(path, text).with_context(|| format!("Failed to write configuration to {}", path.display()))
    }

    /// Reject parameter combinations that would break topology generation or
    /// the cycle algorithm.
    ///
    /// # Returns
    ///
    /// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.field_width == 0 || self.field_height == 0 {
            return Err(format!(
                "Field dimensions must be positive (got {} x {})",
                self.field_width, self.field_height
            ));
        }

        if self.num_points == 0 {
            return Err("NUM_POINTS must be at least 1".to_string());
        }
        let capacity = distinct_coordinate_count(self.field_width as f64, self.field_height as f64);
        if self.num_points as u128 > capacity {
            return Err(format!(
                "NUM_POINTS {} exceeds the {} distinct coordinates available in a {} x {} field",
                self.num_points, capacity, self.field_width, self.field_height
            ));
        }

        if !(self.coverage_radius.is_finite() && self.coverage_radius > 0.0) {
            return Err(format!("COVERAGE_RADIUS must be positive, got {}", self.coverage_radius));
        }
        if !(self.initial_energy.is_finite() && self.initial_energy > 0.0) {
            return Err(format!("INITIAL_ENERGY must be positive, got {}", self.initial_energy));
        }
        if !(0.0..=100.0).contains(&self.min_coverage_percent) {
            return Err(format!(
                "MIN_COVERAGE_PERCENT must be within 0-100, got {}",
                self.min_coverage_percent
            ));
        }

        for (name, cost) in [
            ("TX_COST", self.tx_cost),
            ("RX_COST", self.rx_cost),
            ("IDLE_COST", self.idle_cost),
            ("SLEEP_COST", self.sleep_cost),
        ] {
            if !(cost.is_finite() && cost >= 0.0) {
                return Err(format!("{} must be non-negative, got {}", name, cost));
            }
        }

        for (name, p) in [("FAILURE_PROB", self.failure_prob), ("PACKET_LOSS_PROB", self.packet_loss_prob)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{} must be within 0-1, got {}", name, p));
            }
        }

        if self.seed < UNSEEDED {
            return Err(format!("SEED must be -1 (unseeded) or non-negative, got {}", self.seed));
        }

        Ok(())
    }

    /// Maximum sensor-to-sensor distance counted as a direct link.
    pub fn communication_range(&self) -> f64 {
        self.coverage_radius * COMMUNICATION_RANGE_FACTOR
    }

    /// Points that must be covered for a cycle to meet the coverage target.
    pub fn required_points(&self, point_count: usize) -> usize {
        (self.min_coverage_percent / 100.0 * point_count as f64).floor() as usize
    }

    /// Fixed seed, or `None` for an entropy-seeded run.
    pub fn fixed_seed(&self) -> Option<u64> {
        if self.seed >= 0 { Some(self.seed as u64) } else { None }
    }
}

/// Editable text form of a configuration, one entry per parameter.
///
/// Values stay as typed until `parse` succeeds, so a malformed edit never
/// replaces the configuration currently in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub fields: Vec<(&'static str, String)>,
}

/// Parameter names in display order.
pub const PARAMETER_NAMES: [&str; 15] = [
    "FIELD_WIDTH",
    "FIELD_HEIGHT",
    "NUM_POINTS",
    "MAX_SENSORS",
    "COVERAGE_RADIUS",
    "INITIAL_ENERGY",
    "MIN_COVERAGE_PERCENT",
    "TX_COST",
    "RX_COST",
    "IDLE_COST",
    "SLEEP_COST",
    "SEED",
    "FAILURE_PROB",
    "PACKET_LOSS_PROB",
    "FREQUENCY",
];

fn parse_field<T: std::str::FromStr>(name: &str, text: &str) -> Result<T, ConfigError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::ParseError(format!("{} must be a number, got {:?}", name, text)))
}

impl SettingsForm {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let values = [
            config.field_width.to_string(),
            config.field_height.to_string(),
            config.num_points.to_string(),
            config.max_sensors.to_string(),
            config.coverage_radius.to_string(),
            config.initial_energy.to_string(),
            config.min_coverage_percent.to_string(),
            config.tx_cost.to_string(),
            config.rx_cost.to_string(),
            config.idle_cost.to_string(),
            config.sleep_cost.to_string(),
            config.seed.to_string(),
            config.failure_prob.to_string(),
            config.packet_loss_prob.to_string(),
            config.frequency.to_string(),
        ];
        Self {
            fields: PARAMETER_NAMES.iter().copied().zip(values).collect(),
        }
    }

    fn value(&self, name: &str) -> &str {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str()).unwrap_or("")
    }

    /// Parse every field and validate the result.
    pub fn parse(&self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            field_width: parse_field("FIELD_WIDTH", self.value("FIELD_WIDTH"))?,
            field_height: parse_field("FIELD_HEIGHT", self.value("FIELD_HEIGHT"))?,
            num_points: parse_field("NUM_POINTS", self.value("NUM_POINTS"))?,
            max_sensors: parse_field("MAX_SENSORS", self.value("MAX_SENSORS"))?,
            coverage_radius: parse_field("COVERAGE_RADIUS", self.value("COVERAGE_RADIUS"))?,
            initial_energy: parse_field("INITIAL_ENERGY", self.value("INITIAL_ENERGY"))?,
            min_coverage_percent: parse_field("MIN_COVERAGE_PERCENT", self.value("MIN_COVERAGE_PERCENT"))?,
            tx_cost: parse_field("TX_COST", self.value("TX_COST"))?,
            rx_cost: parse_field("RX_COST", self.value("RX_COST"))?,
            idle_cost: parse_field("IDLE_COST", self.value("IDLE_COST"))?,
            sleep_cost: parse_field("SLEEP_COST", self.value("SLEEP_COST"))?,
            seed: parse_field("SEED", self.value("SEED"))?,
            failure_prob: parse_field("FAILURE_PROB", self.value("FAILURE_PROB"))?,
            packet_loss_prob: parse_field("PACKET_LOSS_PROB", self.value("PACKET_LOSS_PROB"))?,
            frequency: parse_field("FREQUENCY", self.value("FREQUENCY"))?,
        };
        config.validate().map_err(ConfigError::ValidationError)?;
        Ok(config)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> SimulationConfig {
    SimulationConfig {
        field_width: 100,
        field_height: 100,
        num_points: 50,
        max_sensors: 25,
        coverage_radius: 20.0,
        initial_energy: 100.0,
        min_coverage_percent: 80.0,
        tx_cost: 1.0,
        rx_cost: 0.5,
        idle_cost: 0.1,
        sleep_cost: 0.05,
        seed: 42,
        failure_prob: 0.0,
        packet_loss_prob: 0.0,
        frequency: 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[PARAMS]
FIELD_WIDTH = 200
FIELD_HEIGHT = 100
NUM_POINTS = 40
MAX_SENSORS = 16
COVERAGE_RADIUS = 25
INITIAL_ENERGY = 50.0
MIN_COVERAGE_PERCENT = 90
TX_COST = 1.0
RX_COST = 0.5
IDLE_COST = 0.2
SLEEP_COST = 0.1
"#;

    #[test]
    fn parses_params_table_with_defaults() {
        let config = SimulationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.field_width, 200);
        assert_eq!(config.field_height, 100);
        assert_eq!(config.num_points, 40);
        assert_eq!(config.coverage_radius, 25.0);
        assert_eq!(config.min_coverage_percent, 90.0);
        assert_eq!(config.seed, UNSEEDED);
        assert_eq!(config.fixed_seed(), None);
        assert_eq!(config.failure_prob, 0.01);
        assert_eq!(config.packet_loss_prob, 0.05);
        assert_eq!(config.frequency, 500);
        assert_eq!(config.communication_range(), 37.5);
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let text = SAMPLE.replace("TX_COST = 1.0\n", "");
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)), "{:?}", err);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = test_config();
        config.packet_loss_prob = 1.5;
        assert!(config.validate().unwrap_err().contains("PACKET_LOSS_PROB"));

        let mut config = test_config();
        config.min_coverage_percent = 101.0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.field_width = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.sleep_cost = -1.0;
        assert!(config.validate().unwrap_err().contains("SLEEP_COST"));

        let mut config = test_config();
        config.seed = -2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_more_points_than_distinct_coordinates() {
        let mut config = test_config();
        config.field_width = 1;
        config.field_height = 1;
        config.num_points = 101 * 101;
        assert!(config.validate().is_ok());
        config.num_points += 1;
        assert!(config.validate().unwrap_err().contains("NUM_POINTS"));
    }

    #[test]
    fn required_points_floors_the_quota() {
        let mut config = test_config();
        config.min_coverage_percent = 75.0;
        assert_eq!(config.required_points(10), 7);
        config.min_coverage_percent = 100.0;
        assert_eq!(config.required_points(3), 3);
        config.min_coverage_percent = 0.0;
        assert_eq!(config.required_points(3), 0);
    }

    #[test]
    fn toml_round_trip_preserves_configuration() {
        let config = test_config();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[PARAMS]"));
        assert_eq!(SimulationConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn settings_form_reports_malformed_numbers() {
        let config = test_config();
        let mut form = SettingsForm::from_config(&config);
        assert_eq!(form.parse().unwrap(), config);

        form.fields[4].1 = "wide".to_string();
        let err = form.parse().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(ref m) if m.contains("COVERAGE_RADIUS")));

        form.fields[4].1 = "-3".to_string();
        assert!(matches!(form.parse().unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn shipped_scenario_is_valid() {
        let config = SimulationConfig::from_toml_str(include_str!("../../scenarios/default.toml")).unwrap();
        assert_eq!(config.max_sensors, 36);
        assert_eq!(config.fixed_seed(), Some(42));
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("wsn-coverage-simulator-missing-config.toml");
        let err = SimulationConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }
}
