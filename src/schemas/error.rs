#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FillError {
    ScaleUnavailable,
    WeightStuck,
    SafetyTimeout,
    AutotuneTimeout,
    Overfill,
    PressureFault,
}

impl std::error::Error for FillError {}

impl std::fmt::Display for FillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillError::ScaleUnavailable => write!(f, "scale unavailable"),
            FillError::WeightStuck => write!(f, "weight stuck while pressure commanded"),
            FillError::SafetyTimeout => write!(f, "safety stage timed out"),
            FillError::AutotuneTimeout => write!(f, "auto-tune timed out"),
            FillError::Overfill => write!(f, "overfill"),
            FillError::PressureFault => write!(f, "pressure feedback disagrees with command"),
        }
    }
}
