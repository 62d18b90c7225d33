//! Abstract weight source (§4.1). Wire-level serial framing is out of scope;
//! implementers provide this trait and the rest of the control stack never
//! depends on how the pounds value was produced.

use crate::types::Pounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightSample {
    Reading(Pounds),
    Unavailable,
}

pub trait WeightSource {
    /// A single poll. Implementers are responsible for their own internal
    /// sanity banding ([-10.0, 500.0] lbs) and bounded I/O timeout (100ms).
    fn read(&mut self) -> WeightSample;

    /// Idempotent: clears the scale's zero. Safe to call repeatedly.
    fn tare(&mut self);
}
