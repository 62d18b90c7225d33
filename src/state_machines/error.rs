#[derive(Debug)]
pub enum Error {
    InvalidStateTransition(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidStateTransition(message) => {
                write!(f, "InvalidStateTransition: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn description(&self) -> &str {
        match self {
            Error::InvalidStateTransition(_) => "Invalid state transition",
        }
    }
}
