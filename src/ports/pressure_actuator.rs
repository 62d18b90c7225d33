//! Abstract pressure actuator (§4.2). DAC/GPIO primitives are out of scope;
//! this trait is the seam the Fill Controller and Auto-Tune Engine drive.

use crate::types::Percent;

pub trait PressureActuator {
    /// Clamps `percent` to [0, 100], drives the output, and returns the
    /// value actually commanded. Calling this twice with the same value must
    /// be a no-op beyond the first write (idempotence, §8).
    fn set_percent(&mut self, percent: Percent) -> Percent;

    /// Last value actually written (post-clamp).
    fn commanded_percent(&self) -> Percent;

    /// The regulator's own "pressure reached" discrete line. Observational
    /// only; never read by the control loop itself (§4.2).
    fn get_feedback(&self) -> bool;

    /// Advances any internal PWM/duty-cycle bookkeeping the adapter owns,
    /// once per Control period. Software doubles default to a no-op; a
    /// GPIO-backed actuator driving its own software PWM overrides this to
    /// pump that timer (§4.2's "no rate limiting internally" only exempts
    /// the command itself, not the PWM period underneath it).
    fn pump_output(&mut self) {}
}
