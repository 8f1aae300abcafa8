//! Type definitions for the simulation.
//!
//! Contains the data structures shared by every stage of a cycle:
//! - Measurement points and sensor positions
//! - Sensors with their role, energy and on/off/failed state
//! - Sensor classifications used by the snapshot and the run log
//!
//! Sensors live in a single arena (`Vec<Sensor>`) owned by the topology and are
//! referenced everywhere else through `SensorIndex`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a sensor inside the topology's sensor arena.
pub type SensorIndex = usize;

/// Simple 2D point in field units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Distinguishes the data-collection sink from ordinary field sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorRole {
    /// Battery-powered sensor placed on the deployment grid.
    Field(u32),
    /// Fixed endpoint with unlimited energy; terminus of every route.
    Sink,
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorRole::Field(id) => write!(f, "{}", id),
            SensorRole::Sink => write!(f, "SINK"),
        }
    }
}

/// Live classification of a sensor, used for map colors and the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorClass {
    Sink,
    Failed,
    Drained,
    On,
    Off,
}

/// Classification frozen when the run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalClass {
    Sink,
    Failed,
    Drained,
    Surviving,
}

impl fmt::Display for FinalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinalClass::Sink => "sink",
            FinalClass::Failed => "failed",
            FinalClass::Drained => "drained",
            FinalClass::Surviving => "surviving",
        };
        f.write_str(name)
    }
}

/// Sensor with position, battery and runtime state.
///
/// The neighbor list holds arena indices of every other sensor within
/// communication range. It is rebuilt by `geometry::compute_neighbors` and is
/// never edited elsewhere.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub role: SensorRole,
    pub position: Point,
    /// Remaining energy. `f64::INFINITY` for the sink, never negative otherwise.
    pub energy: f64,
    /// Powered on during the last completed cycle.
    pub is_on: bool,
    /// Permanently failed; irreversible.
    pub is_failed: bool,
    pub neighbors: Vec<SensorIndex>,
}

impl Sensor {
    pub fn field(id: u32, position: Point, energy: f64) -> Self {
        Self {
            role: SensorRole::Field(id),
            position,
            energy,
            is_on: false,
            is_failed: false,
            neighbors: Vec::new(),
        }
    }

    pub fn sink(position: Point) -> Self {
        Self {
            role: SensorRole::Sink,
            position,
            energy: f64::INFINITY,
            is_on: false,
            is_failed: false,
            neighbors: Vec::new(),
        }
    }

    pub fn is_sink(&self) -> bool {
        self.role == SensorRole::Sink
    }

    /// Energy left and not failed. The sink is always usable.
    pub fn is_usable(&self) -> bool {
        self.energy > 0.0 && !self.is_failed
    }

    /// Non-sink sensor that may be picked by the coverage optimizer.
    pub fn is_candidate(&self) -> bool {
        !self.is_sink() && self.is_usable()
    }

    /// Deduct `cost` from the battery, clamping at zero.
    ///
    /// The sink ignores all charges. Returns `true` when the charge left the
    /// sensor with no energy.
    pub fn drain(&mut self, cost: f64) -> bool {
        if self.is_sink() {
            return false;
        }
        self.energy -= cost;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            return true;
        }
        false
    }

    /// Mark as permanently failed and empty the battery.
    pub fn fail(&mut self) {
        if self.is_sink() {
            return;
        }
        self.is_failed = true;
        self.energy = 0.0;
    }

    pub fn class(&self) -> SensorClass {
        if self.is_sink() {
            SensorClass::Sink
        } else if self.is_failed {
            SensorClass::Failed
        } else if self.energy <= 0.0 {
            SensorClass::Drained
        } else if self.is_on {
            SensorClass::On
        } else {
            SensorClass::Off
        }
    }

    pub fn final_class(&self) -> FinalClass {
        if self.is_sink() {
            FinalClass::Sink
        } else if self.is_failed {
            FinalClass::Failed
        } else if self.energy <= 0.0 {
            FinalClass::Drained
        } else {
            FinalClass::Surviving
        }
    }
}
