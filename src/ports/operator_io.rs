//! Abstract operator I/O (§6). Pixel-level LCD rendering and rotary-encoder
//! debouncing are out of scope; this is the seam above that hardware.

pub trait OperatorIo {
    /// True exactly once per press-after-a-release edge (release-edge
    /// debouncing lives in the implementer, not the Safety Sequencer).
    fn poll_confirm(&mut self) -> bool;

    /// True when a cancel/back gesture was observed since the last poll.
    fn poll_cancel(&mut self) -> bool;

    /// Detents moved since the last poll; positive increases, negative
    /// decreases `target_lbs`.
    fn poll_rotary_delta(&mut self) -> i32;

    /// Two-line, 16-column text output.
    fn display(&mut self, line1: &str, line2: &str);
}
