//! Abstract command surface (§6): `GET /status`, `POST /start`, `POST /stop`,
//! `POST /set_target`. The real HTTP plumbing is out of scope (no embedded
//! server), so this is the seam a REST handler or a simulate-feature CLI
//! driver would call into.
//!
//! `AdjustTarget`/`StartAutotune`/`CancelAutotune`/`AcceptAutotune` are not
//! named by spec.md's §6 endpoint list (only status/start/stop/set_target
//! are); they're the rotary-detent gesture (§6 Operator I/O) and the
//! auto-tune engine's operator-facing controls (§4.8: "gains exposed" for
//! "operator acceptance"), surfaced through the same command seam since
//! spec.md never defines a separate transport for either. Recorded as an
//! Open Question resolution in DESIGN.md.

use crate::schemas::status::StatusReport;
use crate::types::Pounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Stop,
    SetTarget(TargetLbs),
    AdjustTarget(TargetLbs),
    StartAutotune,
    CancelAutotune,
    AcceptAutotune,
    OperatorReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// `Start` while not in `FillMode::Idle`.
    NotIdle,
    /// `SetTarget` outside `[min_target_lbs, max_target_lbs]`.
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

pub trait CommandPort {
    /// `&self`, not `&mut self`: every implementer here forwards through a
    /// channel or shared handle rather than owning the authoritative state
    /// directly (the Control task does that on its own thread), so callers
    /// never need exclusive access just to dispatch a command.
    fn dispatch(&self, command: Command) -> Result<(), CommandError>;
    fn status(&self) -> StatusReport;
}

pub type TargetLbs = Pounds;
