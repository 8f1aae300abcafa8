//! Shortest hop-count routes from usable sensors to the sink.

use std::collections::{BTreeMap, VecDeque};

use super::types::{Sensor, SensorIndex};

/// Route for every reachable sensor, keyed by source: `[source, …, sink]`.
pub type PathMap = BTreeMap<SensorIndex, Vec<SensorIndex>>;

/// Breadth-first search outward from the sink over the usable sub-graph.
///
/// Only links between two usable sensors (energy left, not failed) are
/// followed. The first route found for a sensor has the fewest hops; ties go to
/// the neighbor discovered first. Sensors cut off from the sink get no entry,
/// and neither does the sink itself.
pub fn paths_to_sink(sink: SensorIndex, sensors: &[Sensor]) -> PathMap {
    let mut paths = PathMap::new();
    if sink >= sensors.len() {
        return paths;
    }

    let usable: Vec<bool> = sensors.iter().map(Sensor::is_usable).collect();
    // next_hop[n] is the neighbor one hop closer to the sink
    let mut next_hop: Vec<Option<SensorIndex>> = vec![None; sensors.len()];
    let mut visited = vec![false; sensors.len()];
    let mut queue = VecDeque::new();

    visited[sink] = true;
    queue.push_back(sink);

    while let Some(current) = queue.pop_front() {
        if !usable[current] {
            continue;
        }
        for &neighbor in &sensors[current].neighbors {
            if visited[neighbor] || !usable[neighbor] {
                continue;
            }
            visited[neighbor] = true;
            next_hop[neighbor] = Some(current);

            let mut path = vec![neighbor];
            let mut hop = current;
            path.push(hop);
            while let Some(n) = next_hop[hop] {
                path.push(n);
                hop = n;
            }
            paths.insert(neighbor, path);
            queue.push_back(neighbor);
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::geometry::Topology;
    use crate::simulation::types::Point;

    /// `s1 – s2 – s3 – sink` spaced 10 apart with a range of 12 (no shortcuts).
    fn chain() -> Topology {
        let sensors = (0..3).map(|i| Sensor::field(i, Point::new(i as f64 * 10.0, 0.0), 5.0)).collect();
        Topology::from_parts(Vec::new(), sensors, Point::new(30.0, 0.0), 12.0)
    }

    #[test]
    fn chain_routes_follow_every_hop() {
        let topo = chain();
        let paths = paths_to_sink(topo.sink, &topo.sensors);
        assert_eq!(topo.sink, 3);
        assert_eq!(paths.get(&0), Some(&vec![0, 1, 2, 3]));
        assert_eq!(paths.get(&1), Some(&vec![1, 2, 3]));
        assert_eq!(paths.get(&2), Some(&vec![2, 3]));
        assert!(!paths.contains_key(&3));
    }

    #[test]
    fn failed_or_drained_relay_cuts_the_chain() {
        let mut topo = chain();
        topo.sensors[1].energy = 0.0;
        let paths = paths_to_sink(topo.sink, &topo.sensors);
        assert_eq!(paths.get(&2), Some(&vec![2, 3]));
        assert!(!paths.contains_key(&1));
        assert!(!paths.contains_key(&0));

        let mut topo = chain();
        topo.sensors[2].fail();
        let paths = paths_to_sink(topo.sink, &topo.sensors);
        assert!(paths.is_empty());
    }

    #[test]
    fn routes_take_the_fewest_hops() {
        // Square: 0 at (0,0), 1 at (10,0), 2 at (0,10), sink at (10,10); range 10.
        let sensors = vec![
            Sensor::field(0, Point::new(0.0, 0.0), 5.0),
            Sensor::field(1, Point::new(10.0, 0.0), 5.0),
            Sensor::field(2, Point::new(0.0, 10.0), 5.0),
        ];
        let topo = Topology::from_parts(Vec::new(), sensors, Point::new(10.0, 10.0), 10.0);
        let paths = paths_to_sink(topo.sink, &topo.sensors);
        assert_eq!(paths[&1], vec![1, 3]);
        assert_eq!(paths[&2], vec![2, 3]);
        // Two equal-length routes; the neighbor discovered first (index 1) wins.
        assert_eq!(paths[&0], vec![0, 1, 3]);
    }

    #[test]
    fn isolated_sensor_has_no_route() {
        let sensors = vec![
            Sensor::field(0, Point::new(0.0, 0.0), 5.0),
            Sensor::field(1, Point::new(90.0, 90.0), 5.0),
        ];
        let topo = Topology::from_parts(Vec::new(), sensors, Point::new(5.0, 0.0), 10.0);
        let paths = paths_to_sink(topo.sink, &topo.sensors);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[&0], vec![0, 2]);
    }
}
