//! Geometry and topology construction.
//!
//! Contains helper functions for:
//! - Euclidean distance and the coverage predicate
//! - Sampling distinct measurement points
//! - Laying out sensors on a near-square grid and placing the sink
//! - Building the symmetric, range-based neighbor graph

use rand::Rng;
use std::collections::HashSet;

use super::types::{Point, Sensor, SensorIndex};
use crate::common::config::SimulationConfig;

/// Sampled coordinates are rounded to this many steps per field unit (2 decimals).
pub const COORDINATE_STEPS_PER_UNIT: f64 = 100.0;

/// Retry budget for rejection sampling: per requested point plus a fixed slack.
const SAMPLING_ATTEMPTS_PER_POINT: usize = 1000;
const SAMPLING_ATTEMPTS_SLACK: usize = 10_000;

/// Error type for topology generation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// Not enough distinct rounded coordinates could be drawn.
    PointSpaceExhausted { requested: usize, generated: usize },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::PointSpaceExhausted { requested, generated } => write!(
                f,
                "Could not sample {} distinct measurement points (got {}); reduce NUM_POINTS or enlarge the field",
                requested, generated
            ),
        }
    }
}

impl std::error::Error for TopologyError {}

/// Euclidean distance in field units.
pub fn distance(a: &Point, b: &Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Inclusive coverage test: the point lies within `coverage_radius` of the sensor.
pub fn covers(sensor: &Sensor, point: &Point, coverage_radius: f64) -> bool {
    distance(&sensor.position, point) <= coverage_radius
}

/// Number of distinct rounded coordinates available in a `width × height` field.
pub fn distinct_coordinate_count(width: f64, height: f64) -> u128 {
    let columns = (width * COORDINATE_STEPS_PER_UNIT).floor() as u128 + 1;
    let rows = (height * COORDINATE_STEPS_PER_UNIT).floor() as u128 + 1;
    columns * rows
}

fn round_coordinate(v: f64) -> (f64, i64) {
    let steps = (v * COORDINATE_STEPS_PER_UNIT).round();
    (steps / COORDINATE_STEPS_PER_UNIT, steps as i64)
}

/// Sample `count` distinct points uniformly over `[0,width]×[0,height]`.
///
/// Coordinates are rounded to two decimals and equality is by rounded
/// coordinate pair. Sampling gives up after a bounded number of attempts
/// instead of spinning when the rounded grid is (nearly) exhausted.
pub fn generate_points<R: Rng + ?Sized>(count: usize, width: f64, height: f64, rng: &mut R) -> Result<Vec<Point>, TopologyError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if (count as u128) > distinct_coordinate_count(width, height) {
        return Err(TopologyError::PointSpaceExhausted { requested: count, generated: 0 });
    }

    let mut points = Vec::with_capacity(count);
    let mut seen: HashSet<(i64, i64)> = HashSet::with_capacity(count);
    let max_attempts = count.saturating_mul(SAMPLING_ATTEMPTS_PER_POINT).saturating_add(SAMPLING_ATTEMPTS_SLACK);
    let mut attempts = 0;

    while points.len() < count {
        if attempts >= max_attempts {
            return Err(TopologyError::PointSpaceExhausted {
                requested: count,
                generated: points.len(),
            });
        }
        attempts += 1;

        let (x, kx) = round_coordinate(rng.gen_range(0.0..=width));
        let (y, ky) = round_coordinate(rng.gen_range(0.0..=height));
        if seen.insert((kx, ky)) {
            points.push(Point::new(x, y));
        }
    }

    Ok(points)
}

/// Lay out up to `count` field sensors on a near-square grid.
///
/// `columns = floor(sqrt(count·width/height))` (at least one),
/// `rows = ceil(count/columns)`. Cells are emitted row by row and emission stops
/// once `count` sensors are placed, so trailing cells of an overshooting grid
/// stay empty.
pub fn generate_sensor_grid(width: f64, height: f64, count: usize, initial_energy: f64) -> Vec<Sensor> {
    let mut sensors = Vec::with_capacity(count + 1);
    if count == 0 || width <= 0.0 || height <= 0.0 {
        return sensors;
    }

    let columns = ((count as f64 * width / height).sqrt().floor() as usize).max(1);
    let rows = count.div_ceil(columns);

    let dx = width / (columns.saturating_sub(1).max(1)) as f64;
    let dy = height / (rows.saturating_sub(1).max(1)) as f64;

    'rows: for row in 0..rows {
        for column in 0..columns {
            if sensors.len() >= count {
                break 'rows;
            }
            let id = sensors.len() as u32;
            sensors.push(Sensor::field(id, Point::new(column as f64 * dx, row as f64 * dy), initial_energy));
        }
    }

    sensors
}

/// Append the sink at the field center and return its index.
pub fn add_sink(sensors: &mut Vec<Sensor>, width: f64, height: f64) -> SensorIndex {
    sensors.push(Sensor::sink(Point::new(width / 2.0, height / 2.0)));
    sensors.len() - 1
}

/// Rebuild every sensor's neighbor list: all other sensors within `range`.
///
/// Pairwise O(n²); previous lists are discarded, so repeated calls with the
/// same positions and range produce identical lists (in ascending index order).
pub fn compute_neighbors(sensors: &mut [Sensor], range: f64) {
    let positions: Vec<Point> = sensors.iter().map(|s| s.position).collect();
    for (i, sensor) in sensors.iter_mut().enumerate() {
        sensor.neighbors.clear();
        for (j, other) in positions.iter().enumerate() {
            if i != j && distance(&positions[i], other) <= range {
                sensor.neighbors.push(j);
            }
        }
    }
}

/// All per-run spatial state: measurement points and the sensor arena.
#[derive(Debug, Clone)]
pub struct Topology {
    pub points: Vec<Point>,
    pub sensors: Vec<Sensor>,
    pub sink: SensorIndex,
}

impl Topology {
    /// Generate points, grid sensors, the sink and the neighbor graph for a run.
    pub fn generate<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<Self, TopologyError> {
        let width = config.field_width as f64;
        let height = config.field_height as f64;

        let points = generate_points(config.num_points, width, height, rng)?;
        let mut sensors = generate_sensor_grid(width, height, config.max_sensors, config.initial_energy);
        let sink = add_sink(&mut sensors, width, height);
        compute_neighbors(&mut sensors, config.communication_range());

        log::info!(
            "Topology generated: {} points, {} sensors, sink #{} at ({:.1}, {:.1})",
            points.len(),
            sensors.len() - 1,
            sink,
            sensors[sink].position.x,
            sensors[sink].position.y
        );

        Ok(Self { points, sensors, sink })
    }

    /// Build a topology from explicit points and field sensors; the sink is appended.
    pub fn from_parts(points: Vec<Point>, mut sensors: Vec<Sensor>, sink_position: Point, communication_range: f64) -> Self {
        sensors.retain(|s| !s.is_sink());
        sensors.push(Sensor::sink(sink_position));
        let sink = sensors.len() - 1;
        compute_neighbors(&mut sensors, communication_range);
        Self { points, sensors, sink }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    #[test]
    fn generated_points_are_distinct_and_counted() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = generate_points(500, 100.0, 80.0, &mut rng).unwrap();
        assert_eq!(points.len(), 500);
        let keys: HashSet<(i64, i64)> = points.iter().map(|pt| ((pt.x * 100.0).round() as i64, (pt.y * 100.0).round() as i64)).collect();
        assert_eq!(keys.len(), 500);
        for pt in &points {
            assert!(pt.x >= 0.0 && pt.x <= 100.0);
            assert!(pt.y >= 0.0 && pt.y <= 80.0);
        }
    }

    #[test]
    fn point_sampling_fails_instead_of_looping_forever() {
        let mut rng = StdRng::seed_from_u64(1);
        // A 0.01 × 0.01 field only has 4 distinct rounded coordinates.
        let err = generate_points(5, 0.01, 0.01, &mut rng).unwrap_err();
        assert!(matches!(err, TopologyError::PointSpaceExhausted { requested: 5, .. }));

        let all = generate_points(4, 0.01, 0.01, &mut rng).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn grid_layout_follows_aspect_ratio() {
        // 100×100 with 9 sensors: 3 columns, 3 rows, spacing 50.
        let sensors = generate_sensor_grid(100.0, 100.0, 9, 10.0);
        assert_eq!(sensors.len(), 9);
        assert_eq!(sensors[0].position, p(0.0, 0.0));
        assert_eq!(sensors[1].position, p(50.0, 0.0));
        assert_eq!(sensors[4].position, p(50.0, 50.0));
        assert_eq!(sensors[8].position, p(100.0, 100.0));
        assert!(sensors.iter().all(|s| s.energy == 10.0 && !s.is_sink()));
    }

    #[test]
    fn grid_stops_emitting_once_count_is_reached() {
        // 7 sensors on a 100×100 field: columns = floor(sqrt(7)) = 2, rows = 4.
        let sensors = generate_sensor_grid(100.0, 100.0, 7, 1.0);
        assert_eq!(sensors.len(), 7);
        let dy = 100.0 / 3.0;
        assert_eq!(sensors[6].position, p(0.0, 3.0 * dy));
        let ids: Vec<String> = sensors.iter().map(|s| s.role.to_string()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn narrow_field_still_gets_one_column() {
        let sensors = generate_sensor_grid(10.0, 100.0, 1, 1.0);
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].position, p(0.0, 0.0));
    }

    #[test]
    fn sink_sits_at_field_center() {
        let mut sensors = generate_sensor_grid(100.0, 60.0, 4, 1.0);
        let sink = add_sink(&mut sensors, 100.0, 60.0);
        assert_eq!(sink, 4);
        assert!(sensors[sink].is_sink());
        assert_eq!(sensors[sink].position, p(50.0, 30.0));
        assert!(sensors[sink].energy.is_infinite());
    }

    #[test]
    fn neighbors_are_symmetric_and_range_exact() {
        let mut sensors = generate_sensor_grid(100.0, 100.0, 25, 1.0);
        add_sink(&mut sensors, 100.0, 100.0);
        let range = 30.0;
        compute_neighbors(&mut sensors, range);

        for (i, s) in sensors.iter().enumerate() {
            assert!(!s.neighbors.contains(&i));
            for (j, o) in sensors.iter().enumerate() {
                if i == j {
                    continue;
                }
                let within = distance(&s.position, &o.position) <= range;
                assert_eq!(s.neighbors.contains(&j), within, "range mismatch for {} -> {}", i, j);
                assert_eq!(s.neighbors.contains(&j), o.neighbors.contains(&i), "asymmetric {} <-> {}", i, j);
            }
        }
    }

    #[test]
    fn neighbor_computation_is_idempotent() {
        let mut sensors = generate_sensor_grid(90.0, 60.0, 12, 1.0);
        add_sink(&mut sensors, 90.0, 60.0);
        compute_neighbors(&mut sensors, 35.0);
        let first: Vec<Vec<SensorIndex>> = sensors.iter().map(|s| s.neighbors.clone()).collect();
        compute_neighbors(&mut sensors, 35.0);
        let second: Vec<Vec<SensorIndex>> = sensors.iter().map(|s| s.neighbors.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn coverage_is_inclusive_at_the_radius() {
        let s = Sensor::field(0, p(0.0, 0.0), 1.0);
        assert!(covers(&s, &p(3.0, 4.0), 5.0));
        assert!(!covers(&s, &p(3.0, 4.01), 5.0));
    }
}
