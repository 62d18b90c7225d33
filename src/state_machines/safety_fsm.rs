use super::FsmError as Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SafetyPhase {
    Idle,
    AirCheck,
    HoseCheck,
    PositionCheck,
    StartCheck,
    Complete,
    Timeout,
    Cancelled,
}

impl Default for SafetyPhase {
    fn default() -> Self {
        SafetyPhase::Idle
    }
}

impl std::fmt::Display for SafetyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SafetyPhase::Idle => "Idle",
            SafetyPhase::AirCheck => "AirCheck",
            SafetyPhase::HoseCheck => "HoseCheck",
            SafetyPhase::PositionCheck => "PositionCheck",
            SafetyPhase::StartCheck => "StartCheck",
            SafetyPhase::Complete => "Complete",
            SafetyPhase::Timeout => "Timeout",
            SafetyPhase::Cancelled => "Cancelled",
        };
        write!(f, "{}", s)
    }
}

impl SafetyPhase {
    /// Monotonic position in the confirmation sequence. Terminal phases are
    /// not part of the ordering the spec requires to be non-decreasing.
    pub fn sequence_index(&self) -> u8 {
        match self {
            SafetyPhase::Idle => 0,
            SafetyPhase::AirCheck => 1,
            SafetyPhase::HoseCheck => 2,
            SafetyPhase::PositionCheck => 3,
            SafetyPhase::StartCheck => 4,
            SafetyPhase::Complete => 5,
            SafetyPhase::Timeout | SafetyPhase::Cancelled => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SafetyPhase::Complete | SafetyPhase::Timeout | SafetyPhase::Cancelled
        )
    }
}

pub enum Transition {
    Begin,
    Confirm,
    StageTimeout,
    Cancel,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Begin => write!(f, "Begin"),
            Transition::Confirm => write!(f, "Confirm"),
            Transition::StageTimeout => write!(f, "StageTimeout"),
            Transition::Cancel => write!(f, "Cancel"),
        }
    }
}

impl SafetyPhase {
    pub fn transition(&mut self, next: Transition) -> Result<(), Error> {
        let result = match (&self, &next) {
            /* ---------------------- */
            /* --- Cancel / timeout --- */
            /* --- from any active  --- */
            /* --- stage            --- */
            /* ---------------------- */
            (
                SafetyPhase::AirCheck
                | SafetyPhase::HoseCheck
                | SafetyPhase::PositionCheck
                | SafetyPhase::StartCheck,
                Transition::StageTimeout,
            ) => Ok(SafetyPhase::Timeout),
            (
                SafetyPhase::AirCheck
                | SafetyPhase::HoseCheck
                | SafetyPhase::PositionCheck
                | SafetyPhase::StartCheck,
                Transition::Cancel,
            ) => Ok(SafetyPhase::Cancelled),

            /* ---------------------- */
            /* --- Stage sequence   --- */
            /* ---------------------- */
            (SafetyPhase::Idle, Transition::Begin) => Ok(SafetyPhase::AirCheck),
            (SafetyPhase::AirCheck, Transition::Confirm) => Ok(SafetyPhase::HoseCheck),
            (SafetyPhase::HoseCheck, Transition::Confirm) => Ok(SafetyPhase::PositionCheck),
            (SafetyPhase::PositionCheck, Transition::Confirm) => Ok(SafetyPhase::StartCheck),
            (SafetyPhase::StartCheck, Transition::Confirm) => Ok(SafetyPhase::Complete),

            /* ---------------------- */
            /* --- Everything else --- */
            /* ---------------------- */
            (_, _) => Err(Error::InvalidStateTransition(format!(
                "{} -> {}",
                self, &next
            ))),
        };

        match result {
            Ok(next_phase) => {
                *self = next_phase;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sequence_reaches_complete() {
        let mut phase = SafetyPhase::Idle;
        phase.transition(Transition::Begin).unwrap();
        phase.transition(Transition::Confirm).unwrap();
        phase.transition(Transition::Confirm).unwrap();
        phase.transition(Transition::Confirm).unwrap();
        phase.transition(Transition::Confirm).unwrap();
        assert_eq!(phase, SafetyPhase::Complete);
    }

    #[test]
    fn stage_timeout_is_terminal() {
        let mut phase = SafetyPhase::HoseCheck;
        phase.transition(Transition::StageTimeout).unwrap();
        assert_eq!(phase, SafetyPhase::Timeout);
        assert!(phase.is_terminal());
        assert!(phase.transition(Transition::Confirm).is_err());
    }

    #[test]
    fn sequence_index_never_decreases_across_a_confirmed_run() {
        let mut phase = SafetyPhase::Idle;
        let mut last = phase.sequence_index();
        for t in [
            Transition::Begin,
            Transition::Confirm,
            Transition::Confirm,
            Transition::Confirm,
            Transition::Confirm,
        ] {
            phase.transition(t).unwrap();
            assert!(phase.sequence_index() >= last);
            last = phase.sequence_index();
        }
    }

    #[test]
    fn cancel_is_always_available_mid_sequence() {
        let mut phase = SafetyPhase::PositionCheck;
        phase.transition(Transition::Cancel).unwrap();
        assert_eq!(phase, SafetyPhase::Cancelled);
    }
}
