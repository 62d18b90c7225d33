use super::FsmError as Error;
use crate::schemas::error::FillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FillMode {
    Idle,
    SafetyCheck,
    Filling,
    Completed,
    Error(FillError),
    Cancelled,
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::Idle
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillMode::Idle => write!(f, "Idle"),
            FillMode::SafetyCheck => write!(f, "SafetyCheck"),
            FillMode::Filling => write!(f, "Filling"),
            FillMode::Completed => write!(f, "Completed"),
            FillMode::Error(e) => write!(f, "Error({})", e),
            FillMode::Cancelled => write!(f, "Cancelled"),
        }
    }
}

pub enum Transition {
    StartRequested,
    SafetyPassed,
    SafetyFailed,
    FillComplete,
    Fault(FillError),
    Cancel,
    Reset,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::StartRequested => write!(f, "StartRequested"),
            Transition::SafetyPassed => write!(f, "SafetyPassed"),
            Transition::SafetyFailed => write!(f, "SafetyFailed"),
            Transition::FillComplete => write!(f, "FillComplete"),
            Transition::Fault(e) => write!(f, "Fault({})", e),
            Transition::Cancel => write!(f, "Cancel"),
            Transition::Reset => write!(f, "Reset"),
        }
    }
}

impl FillMode {
    pub fn transition(&mut self, next: Transition) -> Result<(), Error> {
        let result = match (&self, &next) {
            /* --------------------------- */
            /* --- Fault / cancel from --- */
            /* --- any in-flight state  --- */
            /* --------------------------- */
            (FillMode::Filling, Transition::Fault(kind)) => Ok(FillMode::Error(*kind)),
            (FillMode::SafetyCheck, Transition::Fault(kind)) => Ok(FillMode::Error(*kind)),

            (FillMode::SafetyCheck, Transition::Cancel) => Ok(FillMode::Cancelled),
            (FillMode::Filling, Transition::Cancel) => Ok(FillMode::Cancelled),

            /* --------------------------- */
            /* --- Idle transitions     --- */
            /* --------------------------- */
            (FillMode::Idle, Transition::StartRequested) => Ok(FillMode::SafetyCheck),
            (FillMode::Idle, _) => Err(Error::InvalidStateTransition(format!(
                "{} -> {}",
                self, &next
            ))),

            /* --------------------------- */
            /* --- SafetyCheck          --- */
            /* --------------------------- */
            (FillMode::SafetyCheck, Transition::SafetyPassed) => Ok(FillMode::Filling),
            (FillMode::SafetyCheck, Transition::SafetyFailed) => Ok(FillMode::Cancelled),

            /* --------------------------- */
            /* --- Filling              --- */
            /* --------------------------- */
            (FillMode::Filling, Transition::FillComplete) => Ok(FillMode::Completed),

            /* --------------------------- */
            /* --- Terminal -> Idle     --- */
            /* --------------------------- */
            (FillMode::Completed, Transition::Reset) => Ok(FillMode::Idle),
            (FillMode::Error(_), Transition::Reset) => Ok(FillMode::Idle),
            (FillMode::Cancelled, Transition::Reset) => Ok(FillMode::Idle),

            /* --------------------------- */
            /* --- Everything else     --- */
            /* --------------------------- */
            (_, _) => Err(Error::InvalidStateTransition(format!(
                "{} -> {}",
                self, &next
            ))),
        };

        match result {
            Ok(next_state) => {
                *self = next_state;
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
    fn happy_path_reaches_completed() {
        let mut mode = FillMode::Idle;
        mode.transition(Transition::StartRequested).unwrap();
        assert_eq!(mode, FillMode::SafetyCheck);
        mode.transition(Transition::SafetyPassed).unwrap();
        assert_eq!(mode, FillMode::Filling);
        mode.transition(Transition::FillComplete).unwrap();
        assert_eq!(mode, FillMode::Completed);
        mode.transition(Transition::Reset).unwrap();
        assert_eq!(mode, FillMode::Idle);
    }

    #[test]
    fn overfill_during_filling_becomes_error() {
        let mut mode = FillMode::Filling;
        mode.transition(Transition::Fault(FillError::Overfill))
            .unwrap();
        assert_eq!(mode, FillMode::Error(FillError::Overfill));
        // stuck until an explicit operator reset
        assert!(mode.transition(Transition::FillComplete).is_err());
        mode.transition(Transition::Reset).unwrap();
        assert_eq!(mode, FillMode::Idle);
    }

    #[test]
    fn cancel_from_idle_is_rejected() {
        let mut mode = FillMode::Idle;
        assert!(mode.transition(Transition::Cancel).is_err());
    }

    #[test]
    fn safety_timeout_does_not_reach_filling() {
        let mut mode = FillMode::SafetyCheck;
        mode.transition(Transition::Fault(FillError::SafetyTimeout))
            .unwrap();
        assert_ne!(mode, FillMode::Filling);
    }
}
