//! `simulate`-feature software double for the Weight Source (§4.1), used so
//! the Fill Controller and its surrounding tasks can be exercised on host
//! without the RS232 scale attached. Grounded on the teacher's
//! `models::data_manipulation::ObservedData::apply_noise`: a
//! `rand_distr::Normal` perturbation layered on a deterministic signal,
//! rather than a hand-rolled PRNG.
//!
//! The fill physics modeled here are intentionally crude (accumulated mass
//! proportional to commanded pressure percent) — good enough to drive the
//! zone schedule and PID loop through a realistic-shaped fill, not a
//! metrology model.

use crate::ports::weight_source::{WeightSample, WeightSource};
use crate::types::{Percent, Pounds};
use rand::prelude::*;
use rand_distr::Normal;

const NOISE_STDDEV_LBS: f32 = 0.02;
/// Pounds deposited per tick per percent of commanded pressure, tuned so a
/// 100% command fills a ~40 lbs target in roughly the time the zone
/// schedule's fast zone expects.
const FLOW_GAIN_LBS_PER_TICK_PER_PCT: f32 = 0.0012;

pub struct SimWeightSource {
    true_weight: Pounds,
    commanded_pct: Percent,
    online: bool,
    noise: Normal<f32>,
}

impl SimWeightSource {
    pub fn new(starting_weight: Pounds) -> Self {
        SimWeightSource {
            true_weight: starting_weight,
            commanded_pct: 0.0,
            online: true,
            noise: Normal::new(0.0, NOISE_STDDEV_LBS).unwrap(),
        }
    }

    /// Feeds the pressure percent the Fill Controller is currently
    /// commanding so the simulated mass actually responds to the control
    /// loop, the way a real scale would see the tank gain weight.
    pub fn drive(&mut self, commanded_pct: Percent) {
        self.commanded_pct = commanded_pct;
        self.true_weight += self.commanded_pct.max(0.0) * FLOW_GAIN_LBS_PER_TICK_PER_PCT;
    }

    /// Test/demo hook for exercising the ScaleUnavailable path.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn reset(&mut self, weight: Pounds) {
        self.true_weight = weight;
    }
}

impl WeightSource for SimWeightSource {
    fn read(&mut self) -> WeightSample {
        if !self.online {
            return WeightSample::Unavailable;
        }
        let noise: f32 = self.noise.sample(&mut thread_rng());
        WeightSample::Reading(self.true_weight + noise)
    }

    fn tare(&mut self) {
        self.true_weight = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_weight_proportional_to_commanded_pressure() {
        let mut scale = SimWeightSource::new(0.0);
        for _ in 0..1000 {
            scale.drive(100.0);
        }
        match scale.read() {
            WeightSample::Reading(w) => assert!(w > 1.0, "expected measurable accumulation, got {w}"),
            WeightSample::Unavailable => panic!("expected a reading"),
        }
    }

    #[test]
    fn offline_flag_forces_unavailable() {
        let mut scale = SimWeightSource::new(10.0);
        scale.set_online(false);
        assert_eq!(scale.read(), WeightSample::Unavailable);
    }
}
