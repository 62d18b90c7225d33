//! `simulate`-feature software double for Operator I/O (§4.3), matching the
//! in-memory double pattern the other `ports::*` traits already carry
//! (`ports::parameter_store::InMemoryParameterStore`). A test or a
//! console-driven demo harness queues gestures with `push_confirm`/
//! `push_cancel`/`push_rotary`; `display` just records the last two lines
//! instead of driving real LCD1602 wiring.

use crate::ports::operator_io::OperatorIo;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Confirm,
    Cancel,
    Rotary(i32),
}

#[derive(Default)]
pub struct SimOperatorIo {
    queue: VecDeque<Gesture>,
    last_line1: String,
    last_line2: String,
}

impl SimOperatorIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_confirm(&mut self) {
        self.queue.push_back(Gesture::Confirm);
    }

    pub fn push_cancel(&mut self) {
        self.queue.push_back(Gesture::Cancel);
    }

    pub fn push_rotary(&mut self, delta: i32) {
        self.queue.push_back(Gesture::Rotary(delta));
    }

    pub fn displayed(&self) -> (&str, &str) {
        (&self.last_line1, &self.last_line2)
    }
}

impl OperatorIo for SimOperatorIo {
    fn poll_confirm(&mut self) -> bool {
        if self.queue.front() == Some(&Gesture::Confirm) {
            self.queue.pop_front();
            true
        } else {
            false
        }
    }

    fn poll_cancel(&mut self) -> bool {
        if self.queue.front() == Some(&Gesture::Cancel) {
            self.queue.pop_front();
            true
        } else {
            false
        }
    }

    fn poll_rotary_delta(&mut self) -> i32 {
        if let Some(&Gesture::Rotary(delta)) = self.queue.front() {
            self.queue.pop_front();
            delta
        } else {
            0
        }
    }

    fn display(&mut self, line1: &str, line2: &str) {
        self.last_line1 = line1.to_string();
        self.last_line2 = line2.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gestures_are_consumed_in_fifo_order() {
        let mut io = SimOperatorIo::new();
        io.push_confirm();
        io.push_rotary(3);
        assert!(io.poll_confirm());
        assert!(!io.poll_confirm());
        assert_eq!(io.poll_rotary_delta(), 3);
        assert_eq!(io.poll_rotary_delta(), 0);
    }

    #[test]
    fn display_remembers_last_write() {
        let mut io = SimOperatorIo::new();
        io.display("Fill: 12.3 lbs", "Zone: Moderate");
        assert_eq!(io.displayed(), ("Fill: 12.3 lbs", "Zone: Moderate"));
    }
}
