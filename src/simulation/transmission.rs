//! Packet delivery and radio energy accounting.
//!
//! One delivery attempt walks a route hop by hop. The whole packet may be lost
//! on the channel before anything is charged; otherwise every hop charges the
//! sender its transmit cost and the receiver its receive cost. The sink is free.

use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use super::types::{Sensor, SensorIndex};
use crate::common::config::SimulationConfig;

/// Per-activity energy costs taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCosts {
    pub tx: f64,
    pub rx: f64,
    pub sleep: f64,
}

impl From<&SimulationConfig> for EnergyCosts {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            tx: config.tx_cost,
            rx: config.rx_cost,
            sleep: config.sleep_cost,
        }
    }
}

/// Why a delivery attempt did not reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// Dropped on the channel before the first hop.
    ChannelLoss,
    /// Route has no hop to walk.
    NoHop,
    /// A relay ran out of energy while handling the packet.
    EnergyExhausted { sensor: SensorIndex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionOutcome {
    Delivered { hops: usize },
    Lost(LossReason),
}

/// Draw whether an event with probability `p` happens.
///
/// `p` is clamped into `[0, 1]`; validated configurations never need it.
pub fn chance<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    match Bernoulli::new(p.clamp(0.0, 1.0)) {
        Ok(dist) => dist.sample(rng),
        Err(_) => false,
    }
}

/// Attempt one end-to-end delivery along `path` (`[source, …, sink]`).
///
/// The loss draw comes first, so a lost packet costs nothing. Senders and
/// receivers are charged only while they still hold energy. A charge that
/// empties a sensor aborts the attempt at that hop; energy already spent on
/// earlier hops stays spent.
pub fn transmit<R: Rng + ?Sized>(
    path: &[SensorIndex],
    sensors: &mut [Sensor],
    costs: &EnergyCosts,
    packet_loss_probability: f64,
    rng: &mut R,
) -> TransmissionOutcome {
    if chance(packet_loss_probability, rng) {
        return TransmissionOutcome::Lost(LossReason::ChannelLoss);
    }

    if path.len() < 2 {
        return TransmissionOutcome::Lost(LossReason::NoHop);
    }

    for hop in path.windows(2) {
        let (sender, receiver) = (hop[0], hop[1]);

        if charge(&mut sensors[sender], costs.tx) {
            return TransmissionOutcome::Lost(LossReason::EnergyExhausted { sensor: sender });
        }
        if charge(&mut sensors[receiver], costs.rx) {
            return TransmissionOutcome::Lost(LossReason::EnergyExhausted { sensor: receiver });
        }
    }

    TransmissionOutcome::Delivered { hops: path.len() - 1 }
}

/// Charge a sensor that still holds energy; `true` when it is now empty.
fn charge(sensor: &mut Sensor, cost: f64) -> bool {
    if sensor.is_sink() || sensor.energy <= 0.0 {
        return false;
    }
    sensor.drain(cost)
}
