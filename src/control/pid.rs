//! Variable-rate PID with anti-windup-by-clamping and derivative-on-measurement.
//!
//! The engine is stateless across fills only in the sense that callers reset
//! it explicitly (`reset`); it otherwise carries `integral`/`prev_measurement`
//! across `compute` calls the way a real control loop does.

use serde::{Deserialize, Serialize};

/// Persisted gains, round-tripped bit-exactly through the parameter store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub tuned: bool,
}

impl Default for PidParams {
    fn default() -> Self {
        PidParams {
            kp: 2.5,
            ki: 0.5,
            kd: 0.1,
            tuned: false,
        }
    }
}

pub struct PidEngine {
    params: PidParams,
    output_min: f32,
    output_max: f32,
    integral: f32,
    prev_measurement: f32,
    last_time_us: Option<i64>,
    last_output: f32,
}

impl PidEngine {
    pub fn new(params: PidParams, output_min: f32, output_max: f32) -> Self {
        PidEngine {
            params,
            output_min,
            output_max,
            integral: 0.0,
            prev_measurement: 0.0,
            last_time_us: None,
            last_output: output_min,
        }
    }

    pub fn set_params(&mut self, params: PidParams) {
        self.params = params;
    }

    pub fn params(&self) -> PidParams {
        self.params
    }

    /// Reconfigures the output clamp in place. The hybrid controller calls
    /// this once per tick with the active zone's `±pid_range`, since the
    /// engine's output here represents a bounded adjustment rather than an
    /// absolute percent (§4.6 step 7's corrected blending form).
    pub fn set_output_limits(&mut self, min: f32, max: f32) {
        self.output_min = min;
        self.output_max = max;
        self.last_output = self.last_output.clamp(min, max);
    }

    /// Zeroes the integral and previous-measurement and latches the clock so
    /// the next `compute` call cannot inject a derivative kick.
    pub fn reset(&mut self, now_us: i64) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
        self.last_time_us = Some(now_us);
    }

    /// `integral_limit` lets a caller (the hybrid controller) clamp the
    /// accumulator tighter than the engine's own defaults for the active
    /// zone; pass `(-f32::MAX, f32::MAX)` for "no extra clamp".
    pub fn compute(
        &mut self,
        setpoint: f32,
        measurement: f32,
        now_us: i64,
        integral_limit: (f32, f32),
    ) -> f32 {
        let last_time_us = match self.last_time_us {
            None => {
                self.last_time_us = Some(now_us);
                self.prev_measurement = measurement;
                return self.last_output;
            }
            Some(t) => t,
        };

        let dt = (now_us - last_time_us) as f32 / 1_000_000.0;
        if dt <= 0.0 || dt > 1.0 {
            self.prev_measurement = measurement;
            self.last_time_us = Some(now_us);
            return self.last_output;
        }

        let error = setpoint - measurement;
        let p_term = self.params.kp * error;

        self.integral += error * dt;
        self.integral = self.integral.clamp(integral_limit.0, integral_limit.1);
        let i_term = self.params.ki * self.integral;

        let d_term = -(self.params.kd * (measurement - self.prev_measurement) / dt);

        let output = (p_term + i_term + d_term).clamp(self.output_min, self.output_max);

        self.prev_measurement = measurement;
        self.last_time_us = Some(now_us);
        self.last_output = output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PidEngine {
        PidEngine::new(
            PidParams {
                kp: 1.0,
                ki: 1.0,
                kd: 1.0,
                tuned: false,
            },
            0.0,
            100.0,
        )
    }

    #[test]
    fn first_call_latches_clock_without_kicking() {
        let mut pid = engine();
        let out = pid.compute(10.0, 0.0, 1_000_000, (-50.0, 50.0));
        assert_eq!(out, pid.output_min);
    }

    #[test]
    fn derivative_on_measurement_is_zero_for_a_setpoint_step_with_constant_measurement() {
        let mut pid = engine();
        pid.compute(10.0, 5.0, 0, (-50.0, 50.0));
        let out_before_step = pid.compute(10.0, 5.0, 100_000, (-50.0, 50.0));
        // setpoint jumps, measurement held constant: D term must stay zero
        let out_after_step = pid.compute(50.0, 5.0, 200_000, (-50.0, 50.0));
        let d_component_before = out_before_step - (pid.params.kp * 5.0 + pid.params.ki * pid.integral);
        assert!(d_component_before.abs() < 1e-4);
        // the jump in output is entirely P+I, not D
        assert!(out_after_step > out_before_step);
    }

    #[test]
    fn integrator_never_exceeds_clamp() {
        let mut pid = engine();
        let mut now = 0i64;
        for _ in 0..1000 {
            now += 100_000;
            pid.compute(1000.0, 0.0, now, (-50.0, 50.0));
            assert!(pid.integral <= 50.0 + 1e-3);
            assert!(pid.integral >= -50.0 - 1e-3);
        }
    }

    #[test]
    fn long_gap_resets_without_derivative_kick() {
        let mut pid = engine();
        pid.compute(10.0, 0.0, 0, (-50.0, 50.0));
        let before = pid.last_output;
        // 2 second gap, exceeds the 1.0s dt ceiling
        let out = pid.compute(10.0, 40.0, 2_000_000, (-50.0, 50.0));
        assert_eq!(out, before);
    }

    #[test]
    fn reset_zeroes_integral_and_previous_measurement() {
        let mut pid = engine();
        pid.compute(10.0, 0.0, 0, (-50.0, 50.0));
        pid.compute(10.0, 2.0, 100_000, (-50.0, 50.0));
        assert!(pid.integral != 0.0);
        pid.reset(200_000);
        assert_eq!(pid.integral, 0.0);
        assert_eq!(pid.prev_measurement, 0.0);
    }

    #[test]
    fn output_is_always_within_configured_range() {
        let mut pid = engine();
        let mut now = 0i64;
        for i in 0..200 {
            now += 100_000;
            let out = pid.compute(if i % 2 == 0 { 1000.0 } else { -1000.0 }, 0.0, now, (-50.0, 50.0));
            assert!(out >= 0.0 && out <= 100.0);
        }
    }
}
