//! Operator I/O (§4.3, §6) backed by an LCD1602 text display and a rotary
//! encoder with an integral push-button, matching
//! `original_source/include/display_driver.h`'s "LCD1602 display and rotary
//! encoder driver". Edge detection on the confirm/cancel lines follows the
//! teacher's `gpio::switch::SwitchState::update` state machine (active-low,
//! release-to-ready before the next press counts); the rotary's A/B
//! quadrature lines are read the same way the teacher polls its three front
//! panel switches, just two pins instead of three.
//!
//! Pixel-level LCD rendering is out of scope (§6), so `display` only tracks
//! the two text lines it was last asked to show; the actual LCD1602 write
//! sequence belongs to a `lcd1602`-style driver crate wired in at `board.rs`,
//! not reproduced here.

use crate::ports::operator_io::OperatorIo;
use esp_idf_svc::hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Default, Copy, Clone, PartialEq)]
enum EdgeState {
    Active,
    #[default]
    Released,
}

impl EdgeState {
    fn update(&self, pressed: bool) -> Option<Self> {
        match (pressed, self) {
            (true, Self::Released) => Some(Self::Active),
            (false, Self::Active) => Some(Self::Released),
            _ => None,
        }
    }
}

/// Tracks one press-then-release cycle and yields `true` exactly once, on
/// the poll that observes the release.
#[derive(Default)]
struct ReleaseEdgeDetector {
    armed: bool,
}

impl ReleaseEdgeDetector {
    fn consume(&mut self, current: EdgeState) -> bool {
        match current {
            EdgeState::Active => {
                self.armed = true;
                false
            }
            EdgeState::Released if self.armed => {
                self.armed = false;
                true
            }
            EdgeState::Released => false,
        }
    }
}

struct SharedLines {
    confirm: Arc<RwLock<EdgeState>>,
    cancel: Arc<RwLock<EdgeState>>,
    rotary_cw: Arc<RwLock<EdgeState>>,
    rotary_ccw: Arc<RwLock<EdgeState>>,
}

/// GPIO-backed `OperatorIo`. A background thread polls the four debounced
/// input lines at `POLL_INTERVAL`; `poll_confirm`/`poll_cancel` consume a
/// rising-then-falling edge exactly once, the way the Safety Sequencer's
/// confirm-edge detector expects (§4.4).
pub struct GpioOperatorIo {
    shared: SharedLines,
    confirm_detector: ReleaseEdgeDetector,
    cancel_detector: ReleaseEdgeDetector,
    rotary_cw_detector: ReleaseEdgeDetector,
    rotary_ccw_detector: ReleaseEdgeDetector,
    last_line1: String,
    last_line2: String,
}

impl GpioOperatorIo {
    pub fn new<CONF, CANC, CW, CCW>(
        confirm_pin: CONF,
        cancel_pin: CANC,
        rotary_cw_pin: CW,
        rotary_ccw_pin: CCW,
    ) -> anyhow::Result<Self>
    where
        CONF: InputPin + OutputPin,
        CANC: InputPin + OutputPin,
        CW: InputPin + OutputPin,
        CCW: InputPin + OutputPin,
    {
        let mut confirm = PinDriver::input(confirm_pin)?;
        let mut cancel = PinDriver::input(cancel_pin)?;
        let mut cw = PinDriver::input(rotary_cw_pin)?;
        let mut ccw = PinDriver::input(rotary_ccw_pin)?;
        confirm.set_pull(Pull::Up)?;
        cancel.set_pull(Pull::Up)?;
        cw.set_pull(Pull::Up)?;
        ccw.set_pull(Pull::Up)?;

        let shared = SharedLines {
            confirm: Arc::new(RwLock::new(EdgeState::Released)),
            cancel: Arc::new(RwLock::new(EdgeState::Released)),
            rotary_cw: Arc::new(RwLock::new(EdgeState::Released)),
            rotary_ccw: Arc::new(RwLock::new(EdgeState::Released)),
        };

        let confirm_clone = shared.confirm.clone();
        let cancel_clone = shared.cancel.clone();
        let cw_clone = shared.rotary_cw.clone();
        let ccw_clone = shared.rotary_ccw.clone();

        thread::spawn(move || loop {
            poll_one(&mut confirm, &confirm_clone);
            poll_one(&mut cancel, &cancel_clone);
            poll_one(&mut cw, &cw_clone);
            poll_one(&mut ccw, &ccw_clone);
            thread::sleep(POLL_INTERVAL);
        });

        Ok(GpioOperatorIo {
            shared,
            confirm_detector: ReleaseEdgeDetector::default(),
            cancel_detector: ReleaseEdgeDetector::default(),
            rotary_cw_detector: ReleaseEdgeDetector::default(),
            rotary_ccw_detector: ReleaseEdgeDetector::default(),
            last_line1: String::new(),
            last_line2: String::new(),
        })
    }
}

fn poll_one<P: InputPin + OutputPin>(pin: &mut PinDriver<P, Input>, edge: &Arc<RwLock<EdgeState>>) {
    let pressed = pin.is_low();
    let last = *edge.read().unwrap();
    if let Some(next) = last.update(pressed) {
        *edge.write().unwrap() = next;
    }
}

impl OperatorIo for GpioOperatorIo {
    fn poll_confirm(&mut self) -> bool {
        let current = *self.shared.confirm.read().unwrap();
        self.confirm_detector.consume(current)
    }

    fn poll_cancel(&mut self) -> bool {
        let current = *self.shared.cancel.read().unwrap();
        self.cancel_detector.consume(current)
    }

    fn poll_rotary_delta(&mut self) -> i32 {
        let cw = *self.shared.rotary_cw.read().unwrap();
        let ccw = *self.shared.rotary_ccw.read().unwrap();
        let cw_fired = self.rotary_cw_detector.consume(cw);
        let ccw_fired = self.rotary_ccw_detector.consume(ccw);
        match (cw_fired, ccw_fired) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }

    fn display(&mut self, line1: &str, line2: &str) {
        if self.last_line1 != line1 || self.last_line2 != line2 {
            log::info!("lcd1602: [{:<16}] [{:<16}]", line1, line2);
            self.last_line1 = line1.to_string();
            self.last_line2 = line2.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_edge_detector_fires_once_per_cycle() {
        let mut d = ReleaseEdgeDetector::default();
        assert!(!d.consume(EdgeState::Released));
        assert!(!d.consume(EdgeState::Active));
        assert!(!d.consume(EdgeState::Active));
        assert!(d.consume(EdgeState::Released));
        assert!(!d.consume(EdgeState::Released));
    }
}
