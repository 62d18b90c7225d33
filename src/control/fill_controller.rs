//! The top-level fill state machine (§4.6, §8): pumps `FillMode`, runs the
//! hybrid zone/PID blend while `Filling`, and owns the completion/error
//! accounting that spec.md §5 requires to commit as one critical section.
//!
//! Grounded on `original_source/components/pressure_controller/pressure_controller.c`
//! (`pressure_controller_run` for the hybrid blend, `check_overfill`) and
//! `original_source/components/safety_system/safety_system.c` for the
//! SafetyCheck -> Filling handoff. The per-task split (Weight/Control/
//! Operator/Telemetry) itself is grounded on the teacher's
//! `components/boiler.rs` message-driven worker, generalised here to a
//! polled `tick` instead of a mailbox since spec.md's Control task is a
//! fixed-rate loop, not an event consumer.

use crate::config::Config;
use crate::control::pid::{PidEngine, PidParams};
use crate::control::zone::{self, Zone};
use crate::schemas::error::FillError;
use crate::schemas::fill_record::{FillRecord, FillStats};
use crate::state_machines::fill_fsm::{FillMode, Transition as FillTransition};
use crate::state_machines::safety_fsm::SafetyPhase;
use crate::types::{Percent, Pounds, PoundsPerSecond};
use std::time::Instant;

/// Fixed Control-task period (§5): the flow low-pass filter and the
/// weight-stuck/scale-unavailable tick counters are all expressed in units
/// of this period rather than a measured `dt`, since the task is rate-
/// monotonic, not free-running.
pub const TICK_PERIOD_S: f32 = 0.1;

const FLOW_FILTER_ALPHA: f32 = 0.3;
/// Debounce window for the optional `PressureFault` detector (SPEC_FULL
/// §11): sustained disagreement between a non-trivial commanded percent and
/// the regulator's "pressure-reached" line for this many ticks is a fault.
const PRESSURE_FAULT_TICKS: u32 = 5;
const PRESSURE_FAULT_MIN_CMD_PCT: Percent = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    NotIdle,
    OutOfRange,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotIdle => write!(f, "not idle"),
            CommandError::OutOfRange => write!(f, "target out of range"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Result of one Control-task tick: the percent to write to the actuator
/// this period, and (on the tick a fill completes) the record to publish
/// at QoS 1.
pub struct TickOutput {
    pub pressure_cmd_pct: Percent,
    pub fill_record: Option<FillRecord>,
}

impl TickOutput {
    fn pct(pct: Percent) -> Self {
        TickOutput {
            pressure_cmd_pct: pct,
            fill_record: None,
        }
    }
}

pub struct FillController {
    mode: FillMode,
    pid: PidEngine,
    epoch: Instant,
    active_zone: Zone,
    zone_transitions: u32,
    target_lbs: Pounds,
    start_lbs: Pounds,
    prev_weight: Pounds,
    flow_filt: PoundsPerSecond,
    pressure_cmd_pct: Percent,
    pressure_sum: f32,
    pressure_samples: u32,
    fill_number: u64,
    fills_today: u32,
    total_lbs_today: Pounds,
    fill_start: Option<Instant>,
    scale_unavailable_run: u32,
    weight_stuck_run: u32,
    pressure_fault_run: u32,
    stats: FillStats,
}

impl FillController {
    pub fn new(default_target_lbs: Pounds, fill_number: u64, now: Instant) -> Self {
        FillController {
            mode: FillMode::Idle,
            pid: PidEngine::new(PidParams::default(), 0.0, 100.0),
            epoch: now,
            active_zone: Zone::Idle,
            zone_transitions: 0,
            target_lbs: default_target_lbs,
            start_lbs: 0.0,
            prev_weight: 0.0,
            flow_filt: 0.0,
            pressure_cmd_pct: 0.0,
            pressure_sum: 0.0,
            pressure_samples: 0,
            fill_number,
            fills_today: 0,
            total_lbs_today: 0.0,
            fill_start: None,
            scale_unavailable_run: 0,
            weight_stuck_run: 0,
            pressure_fault_run: 0,
            stats: FillStats::default(),
        }
    }

    pub fn mode(&self) -> FillMode {
        self.mode
    }

    pub fn active_zone(&self) -> Zone {
        self.active_zone
    }

    pub fn target_lbs(&self) -> Pounds {
        self.target_lbs
    }

    pub fn zone_transitions(&self) -> u32 {
        self.zone_transitions
    }

    pub fn pressure_cmd_pct(&self) -> Percent {
        self.pressure_cmd_pct
    }

    pub fn fill_number(&self) -> u64 {
        self.fill_number
    }

    pub fn fills_today(&self) -> u32 {
        self.fills_today
    }

    pub fn total_lbs_today(&self) -> Pounds {
        self.total_lbs_today
    }

    pub fn stats(&self) -> FillStats {
        self.stats
    }

    fn micros(&self, now: Instant) -> i64 {
        now.duration_since(self.epoch).as_micros() as i64
    }

    /// `POST /start` (§6): Idle -> SafetyCheck only.
    pub fn request_start(&mut self) -> Result<(), CommandError> {
        if self.mode != FillMode::Idle {
            return Err(CommandError::NotIdle);
        }
        self.mode
            .transition(FillTransition::StartRequested)
            .expect("Idle -> SafetyCheck is always valid");
        self.zone_transitions = 0;
        self.active_zone = Zone::Idle;
        self.prev_weight = 0.0;
        self.flow_filt = 0.0;
        self.pressure_sum = 0.0;
        self.pressure_samples = 0;
        self.scale_unavailable_run = 0;
        self.weight_stuck_run = 0;
        self.pressure_fault_run = 0;
        Ok(())
    }

    /// `POST /stop` (§6): any non-Idle mode -> Cancelled. Always commands 0%
    /// so the caller can drive the actuator within the same Control period
    /// (§5's cancellation-within-one-period requirement).
    pub fn request_stop(&mut self) -> Percent {
        if self.mode != FillMode::Idle {
            let _ = self.mode.transition(FillTransition::Cancel);
        }
        self.pressure_cmd_pct = 0.0;
        0.0
    }

    /// `POST /set_target` (§6): accepted only in Idle and only within
    /// `[min_target_lbs, max_target_lbs]`. Rejected requests leave
    /// `target_lbs` unchanged (scenario 6, §8).
    pub fn set_target(
        &mut self,
        target_lbs: Pounds,
        min_target_lbs: Pounds,
        max_target_lbs: Pounds,
    ) -> Result<(), CommandError> {
        if self.mode != FillMode::Idle {
            return Err(CommandError::NotIdle);
        }
        if !(min_target_lbs..=max_target_lbs).contains(&target_lbs) {
            return Err(CommandError::OutOfRange);
        }
        self.target_lbs = target_lbs;
        Ok(())
    }

    /// Rotary-detent adjustment (§6 Operator I/O): same acceptance rule as
    /// `set_target`, called from the Operator task while Idle.
    pub fn adjust_target(
        &mut self,
        delta_lbs: Pounds,
        min_target_lbs: Pounds,
        max_target_lbs: Pounds,
    ) {
        if self.mode != FillMode::Idle {
            return;
        }
        self.target_lbs = (self.target_lbs + delta_lbs).clamp(min_target_lbs, max_target_lbs);
    }

    /// An operator confirm press after a terminal mode is displayed (§7):
    /// the only way out of Completed/Error/Cancelled back to Idle.
    pub fn operator_reset(&mut self) {
        if matches!(
            self.mode,
            FillMode::Completed | FillMode::Error(_) | FillMode::Cancelled
        ) {
            let _ = self.mode.transition(FillTransition::Reset);
        }
    }

    /// One Operator-task safety tick's outcome, consumed once per Control
    /// period while `mode == SafetyCheck`. `current_lbs` is the weight
    /// captured as `start_lbs` on a passing sequence.
    pub fn on_safety_phase(&mut self, phase: SafetyPhase, current_lbs: Pounds, now: Instant) -> Percent {
        if self.mode != FillMode::SafetyCheck {
            return self.pressure_cmd_pct;
        }
        match phase {
            SafetyPhase::Complete => {
                self.mode
                    .transition(FillTransition::SafetyPassed)
                    .expect("SafetyCheck -> Filling is always valid");
                self.start_lbs = current_lbs;
                self.prev_weight = current_lbs;
                self.fill_start = Some(now);
                self.pid.reset(self.micros(now));
            }
            SafetyPhase::Timeout => {
                let _ = self
                    .mode
                    .transition(FillTransition::Fault(FillError::SafetyTimeout));
            }
            SafetyPhase::Cancelled => {
                let _ = self.mode.transition(FillTransition::SafetyFailed);
            }
            _ => {}
        }
        self.pressure_cmd_pct = 0.0;
        0.0
    }

    /// The hybrid zone/PID control law (§4.6), run once per Control period
    /// while `mode == Filling`. No-ops (returns the last command unchanged)
    /// outside `Filling`.
    #[allow(clippy::too_many_arguments)]
    pub fn tick_filling(
        &mut self,
        current_lbs: Pounds,
        scale_online: bool,
        pressure_feedback: bool,
        now: Instant,
        cfg: &Config,
        pid_params: PidParams,
        pid_enabled: bool,
    ) -> TickOutput {
        if self.mode != FillMode::Filling {
            return TickOutput::pct(self.pressure_cmd_pct);
        }

        if !scale_online {
            self.scale_unavailable_run += 1;
            if self.scale_unavailable_run >= cfg.fill.scale_unavailable_ticks {
                log::error!("fill: scale unavailable for {} ticks, aborting", self.scale_unavailable_run);
                let _ = self
                    .mode
                    .transition(FillTransition::Fault(FillError::ScaleUnavailable));
                self.pressure_cmd_pct = 0.0;
                return TickOutput::pct(0.0);
            }
            // Transient: command stays at its last value this period.
            return TickOutput::pct(self.pressure_cmd_pct);
        }
        self.scale_unavailable_run = 0;

        if current_lbs > self.target_lbs * cfg.fill.overfill_ratio {
            log::error!(
                "fill: overfill {:.2} lbs > {:.2} * {:.3}",
                current_lbs,
                self.target_lbs,
                cfg.fill.overfill_ratio
            );
            let _ = self.mode.transition(FillTransition::Fault(FillError::Overfill));
            self.pressure_cmd_pct = 0.0;
            return TickOutput::pct(0.0);
        }

        let progress = 100.0 * current_lbs / self.target_lbs;
        let zone_desc = match zone::select(progress) {
            None => {
                self.pressure_cmd_pct = 0.0;
                self.mode
                    .transition(FillTransition::FillComplete)
                    .expect("Filling -> Completed is always valid");
                let record = self.commit_completion(current_lbs, now);
                return TickOutput {
                    pressure_cmd_pct: 0.0,
                    fill_record: Some(record),
                };
            }
            Some(z) => z,
        };

        if zone_desc.zone != self.active_zone {
            self.zone_transitions += 1;
            self.active_zone = zone_desc.zone;
            self.pid.reset(self.micros(now));
        }

        let weight_moved = (current_lbs - self.prev_weight).abs() >= cfg.fill.weight_stuck_epsilon_lbs;
        if !weight_moved && self.pressure_cmd_pct > 0.0 {
            self.weight_stuck_run += 1;
            if self.weight_stuck_run >= cfg.fill.weight_stuck_ticks {
                log::error!("fill: weight stuck for {} ticks", self.weight_stuck_run);
                let _ = self.mode.transition(FillTransition::Fault(FillError::WeightStuck));
                self.pressure_cmd_pct = 0.0;
                return TickOutput::pct(0.0);
            }
        } else {
            self.weight_stuck_run = 0;
        }

        let flow = (current_lbs - self.prev_weight) / TICK_PERIOD_S;
        self.flow_filt = FLOW_FILTER_ALPHA * flow + (1.0 - FLOW_FILTER_ALPHA) * self.flow_filt;
        self.prev_weight = current_lbs;

        let final_pct = if pid_enabled {
            let scaled = PidParams {
                kp: pid_params.kp * zone_desc.gain_multiplier,
                ki: pid_params.ki * zone_desc.gain_multiplier,
                kd: pid_params.kd * zone_desc.gain_multiplier,
                tuned: pid_params.tuned,
            };
            self.pid.set_params(scaled);
            self.pid
                .set_output_limits(-zone_desc.pid_range_pct, zone_desc.pid_range_pct);
            // §4.4's global [I_MIN, I_MAX] clamp intersected with §4.6 step 6's
            // tighter per-zone bound (`pid_range / (ki_eff + 1e-3)`), since the
            // zone bound alone can exceed the global one when ki_eff is small.
            let zone_limit = zone_desc.pid_range_pct / (scaled.ki + 1e-3);
            let integral_limit = zone_limit.min(cfg.pid.integral_max).max(0.0);
            let adjustment = self.pid.compute(
                zone_desc.target_flow_lbs_per_s,
                self.flow_filt,
                self.micros(now),
                (-integral_limit, integral_limit),
            );
            (zone_desc.base_setpoint_pct + adjustment).clamp(0.0, 100.0)
        } else {
            zone_desc.base_setpoint_pct
        };

        self.pressure_cmd_pct = final_pct;
        self.pressure_sum += final_pct;
        self.pressure_samples += 1;
        if self.check_pressure_fault(final_pct, pressure_feedback) {
            let _ = self.mode.transition(FillTransition::Fault(FillError::PressureFault));
            self.pressure_cmd_pct = 0.0;
            return TickOutput::pct(0.0);
        }

        TickOutput::pct(final_pct)
    }

    /// Returns true the tick the debounce window trips (§11's "sustained
    /// disagreement" window), not on every tick the counter is nonzero.
    fn check_pressure_fault(&mut self, commanded_pct: Percent, feedback: bool) -> bool {
        if commanded_pct >= PRESSURE_FAULT_MIN_CMD_PCT && !feedback {
            self.pressure_fault_run += 1;
            if self.pressure_fault_run >= PRESSURE_FAULT_TICKS {
                log::error!("fill: pressure feedback disagrees with {commanded_pct:.1}% commanded for {} ticks", self.pressure_fault_run);
                return true;
            }
        } else {
            self.pressure_fault_run = 0;
        }
        false
    }

    fn commit_completion(&mut self, final_lbs: Pounds, now: Instant) -> FillRecord {
        self.fill_number += 1;
        self.fills_today += 1;
        self.total_lbs_today += final_lbs;
        let elapsed_ms = self
            .fill_start
            .map(|start| now.duration_since(start).as_millis() as u64)
            .unwrap_or(0);
        let avg_pressure_pct = if self.pressure_samples > 0 {
            self.pressure_sum / self.pressure_samples as f32
        } else {
            0.0
        };
        self.stats.record(
            self.fill_number,
            elapsed_ms,
            (final_lbs - self.target_lbs).abs(),
            avg_pressure_pct,
        );
        log::info!(
            "fill #{} complete: {:.2}/{:.2} lbs in {} ms, {} zone transitions",
            self.fill_number,
            final_lbs,
            self.target_lbs,
            elapsed_ms,
            self.zone_transitions
        );
        FillRecord {
            fill_number: self.fill_number,
            target_lbs: self.target_lbs,
            final_lbs,
            zone_transitions: self.zone_transitions,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn passed_safety(ctrl: &mut FillController, now: Instant) {
        ctrl.request_start().unwrap();
        ctrl.on_safety_phase(SafetyPhase::Complete, 0.0, now);
        assert_eq!(ctrl.mode(), FillMode::Filling);
    }

    /// Scenario 1 of spec.md §8: target=100, pid disabled, zone-appropriate
    /// steps; expect the Fast/Moderate/Slow/Fine/complete command sequence.
    #[test]
    fn happy_fill_pure_zone_mode_matches_scenario_one() {
        let cfg = Config::default();
        let t0 = Instant::now();
        let mut ctrl = FillController::new(100.0, 0, t0);
        ctrl.set_target(100.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .unwrap();
        passed_safety(&mut ctrl, t0);

        let weights = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 85.0, 90.0, 97.5, 100.0];
        let mut last_pct = 0.0;
        let mut now = t0;
        for (i, w) in weights.iter().enumerate() {
            now = t0 + Duration::from_millis(100 * (i as u64 + 1));
            let out = ctrl.tick_filling(*w, true, true, now, &cfg, PidParams::default(), false);
            last_pct = out.pressure_cmd_pct;
            if out.fill_record.is_some() {
                break;
            }
        }
        assert_eq!(ctrl.mode(), FillMode::Completed);
        assert_eq!(last_pct, 0.0);
        assert_eq!(ctrl.fills_today(), 1);
        assert_eq!(ctrl.fill_number(), 1);
    }

    #[test]
    fn overfill_commands_zero_and_enters_error() {
        let cfg = Config::default();
        let t0 = Instant::now();
        let mut ctrl = FillController::new(100.0, 0, t0);
        ctrl.set_target(100.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .unwrap();
        passed_safety(&mut ctrl, t0);

        let now = t0 + Duration::from_millis(100);
        let out = ctrl.tick_filling(105.0, true, true, now, &cfg, PidParams::default(), true);
        assert_eq!(out.pressure_cmd_pct, 0.0);
        assert_eq!(ctrl.mode(), FillMode::Error(FillError::Overfill));
    }

    #[test]
    fn set_target_rejects_out_of_range_and_keeps_prior_value() {
        let cfg = Config::default();
        let mut ctrl = FillController::new(200.0, 0, Instant::now());
        assert!(ctrl
            .set_target(300.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .is_err());
        assert!(ctrl
            .set_target(5.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .is_err());
        assert_eq!(ctrl.target_lbs(), 200.0);
    }

    #[test]
    fn safety_timeout_does_not_reach_filling() {
        let mut ctrl = FillController::new(100.0, 0, Instant::now());
        ctrl.request_start().unwrap();
        ctrl.on_safety_phase(SafetyPhase::Timeout, 0.0, Instant::now());
        assert_eq!(ctrl.mode(), FillMode::Error(FillError::SafetyTimeout));
    }

    #[test]
    fn stop_cancels_from_any_active_mode_and_commands_zero() {
        let mut ctrl = FillController::new(100.0, 0, Instant::now());
        ctrl.request_start().unwrap();
        let pct = ctrl.request_stop();
        assert_eq!(pct, 0.0);
        assert_eq!(ctrl.mode(), FillMode::Cancelled);
    }

    #[test]
    fn weight_stuck_while_pressure_commanded_enters_error() {
        let cfg = Config::default();
        let t0 = Instant::now();
        let mut ctrl = FillController::new(100.0, 0, t0);
        ctrl.set_target(100.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .unwrap();
        passed_safety(&mut ctrl, t0);

        // first tick establishes a non-zero command
        let now = t0 + Duration::from_millis(100);
        ctrl.tick_filling(0.0, true, true, now, &cfg, PidParams::default(), false);
        assert!(ctrl.pressure_cmd_pct() > 0.0);

        // weight never moves for weight_stuck_ticks more periods
        let mut now = now;
        for i in 1..=cfg.fill.weight_stuck_ticks {
            now = t0 + Duration::from_millis(100 * (i as u64 + 1));
            ctrl.tick_filling(0.0, true, true, now, &cfg, PidParams::default(), false);
        }
        assert_eq!(ctrl.mode(), FillMode::Error(FillError::WeightStuck));
    }

    #[test]
    fn sustained_pressure_feedback_disagreement_enters_error() {
        let cfg = Config::default();
        let t0 = Instant::now();
        let mut ctrl = FillController::new(100.0, 0, t0);
        ctrl.set_target(100.0, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
            .unwrap();
        passed_safety(&mut ctrl, t0);

        // Fast zone commands well above PRESSURE_FAULT_MIN_CMD_PCT; feedback
        // never confirms, so the debounce window should trip.
        let mut now = t0;
        for i in 1..=PRESSURE_FAULT_TICKS {
            now = t0 + Duration::from_millis(100 * i as u64);
            let out = ctrl.tick_filling(0.0, true, false, now, &cfg, PidParams::default(), false);
            if i < PRESSURE_FAULT_TICKS {
                assert_ne!(ctrl.mode(), FillMode::Error(FillError::PressureFault));
            } else {
                assert_eq!(out.pressure_cmd_pct, 0.0);
            }
        }
        assert_eq!(ctrl.mode(), FillMode::Error(FillError::PressureFault));
    }

    #[test]
    fn persistent_scale_unavailable_aborts_the_fill() {
        let cfg = Config::default();
        let t0 = Instant::now();
        let mut ctrl = FillController::new(100.0, 0, t0);
        passed_safety(&mut ctrl, t0);

        let mut now = t0;
        for i in 1..=cfg.fill.scale_unavailable_ticks {
            now = t0 + Duration::from_millis(100 * i as u64);
            ctrl.tick_filling(0.0, false, true, now, &cfg, PidParams::default(), false);
        }
        assert_eq!(ctrl.mode(), FillMode::Error(FillError::ScaleUnavailable));
    }

    #[test]
    fn operator_reset_returns_terminal_modes_to_idle() {
        let mut ctrl = FillController::new(100.0, 0, Instant::now());
        ctrl.request_start().unwrap();
        ctrl.request_stop();
        assert_eq!(ctrl.mode(), FillMode::Cancelled);
        ctrl.operator_reset();
        assert_eq!(ctrl.mode(), FillMode::Idle);
    }
}
