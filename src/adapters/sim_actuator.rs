//! `simulate`-feature software double for the Pressure Actuator (§4.2).
//! Tracks the commanded percent like the real DAC adapter and raises its
//! "pressure reached" feedback line once the commanded percent has held
//! above a threshold for a short settling time, the way the ITV2030
//! regulator's own discrete output behaves.

use crate::ports::pressure_actuator::PressureActuator;
use crate::types::Percent;
use std::time::{Duration, Instant};

const FEEDBACK_THRESHOLD_PCT: Percent = 5.0;
const SETTLING_TIME: Duration = Duration::from_millis(300);

pub struct SimActuator {
    commanded_pct: Percent,
    above_threshold_since: Option<Instant>,
}

impl SimActuator {
    pub fn new() -> Self {
        SimActuator {
            commanded_pct: 0.0,
            above_threshold_since: None,
        }
    }
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureActuator for SimActuator {
    fn set_percent(&mut self, percent: Percent) -> Percent {
        let clamped = percent.clamp(0.0, 100.0);
        if clamped < FEEDBACK_THRESHOLD_PCT {
            self.above_threshold_since = None;
        } else if self.above_threshold_since.is_none() {
            self.above_threshold_since = Some(Instant::now());
        }
        self.commanded_pct = clamped;
        self.commanded_pct
    }

    fn commanded_percent(&self) -> Percent {
        self.commanded_pct
    }

    fn get_feedback(&self) -> bool {
        self.above_threshold_since
            .is_some_and(|since| since.elapsed() >= SETTLING_TIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn feedback_rises_only_after_settling_time_above_threshold() {
        let mut actuator = SimActuator::new();
        actuator.set_percent(50.0);
        assert!(!actuator.get_feedback());
        sleep(SETTLING_TIME + Duration::from_millis(50));
        assert!(actuator.get_feedback());
    }

    #[test]
    fn feedback_drops_immediately_when_commanded_below_threshold() {
        let mut actuator = SimActuator::new();
        actuator.set_percent(50.0);
        sleep(SETTLING_TIME + Duration::from_millis(50));
        assert!(actuator.get_feedback());
        actuator.set_percent(0.0);
        assert!(!actuator.get_feedback());
    }
}
