//! Pressure Actuator (§4.2, §6) backed by a PWM output driving the ITV2030
//! regulator's analog command line, plus a digital "pressure-reached" input.
//!
//! `original_source/components/pressure_controller/pressure_controller.c`
//! drives a real 8-bit DAC (`dac_output_voltage`) through an op-amp; this
//! board generation's HAL exposes no DAC peripheral, so the PWM stands in
//! for it the way the teacher drives its own analog-ish actuators
//! (`board.rs`'s `boiler_duty_cycle`/`pump_duty_cycle`, `gpio::pwm::Pwm`).
//! §6's literal contract ("one 8-bit value 0-255 ... linear map from
//! [0,100] percent to [0,255]") is still honored rather than bypassed:
//! `set_percent` quantizes through `percent_to_dac_value` first and only
//! then turns the resulting 8-bit value into a duty cycle (`value / 255.0`),
//! so the PWM's duty always lands on one of the 256 steps a real DAC would
//! produce.

use crate::gpio::pwm::Pwm;
use crate::ports::pressure_actuator::PressureActuator;
use crate::types::Percent;
use esp_idf_svc::hal::gpio::{InputPin, OutputPin, PinDriver};
use std::time::Duration;

/// §6's literal linear map, kept separate from the PWM duty cycle so a
/// reviewer can check it against the spec without reading hardware code.
pub fn percent_to_dac_value(percent: Percent) -> u8 {
    let clamped = percent.clamp(0.0, 100.0);
    ((clamped / 100.0) * 255.0).round() as u8
}

pub struct DacActuator<'a, OUT: OutputPin, IN: InputPin> {
    pwm: Pwm<'a, OUT>,
    feedback: PinDriver<'a, IN, esp_idf_svc::hal::gpio::Input>,
    commanded_pct: Percent,
}

impl<'a, OUT, IN> DacActuator<'a, OUT, IN>
where
    OUT: OutputPin,
    IN: InputPin,
{
    pub fn new(out_pin: OUT, feedback_pin: IN, pwm_period: Duration) -> anyhow::Result<Self> {
        let pwm = Pwm::new(out_pin, pwm_period, None);
        let feedback = PinDriver::input(feedback_pin)?;
        Ok(DacActuator {
            pwm,
            feedback,
            commanded_pct: 0.0,
        })
    }

}

impl<'a, OUT, IN> PressureActuator for DacActuator<'a, OUT, IN>
where
    OUT: OutputPin,
    IN: InputPin,
{
    fn set_percent(&mut self, percent: Percent) -> Percent {
        let clamped = percent.clamp(0.0, 100.0);
        if clamped != self.commanded_pct {
            let dac_value = percent_to_dac_value(clamped);
            self.pwm.set_duty_cycle(dac_value as f32 / 255.0);
            self.commanded_pct = clamped;
        }
        self.commanded_pct
    }

    fn commanded_percent(&self) -> Percent {
        self.commanded_pct
    }

    fn get_feedback(&self) -> bool {
        self.feedback.is_high()
    }

    /// The PWM's internal `on_time`/`off_time` bookkeeping needs driving
    /// independently of `set_percent` (§4.2's "no rate limiting internally"
    /// means the PWM period, not the GPIO toggling, is this adapter's
    /// concern alone).
    fn pump_output(&mut self) {
        let _ = self.pwm.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_map_matches_spec_endpoints() {
        assert_eq!(percent_to_dac_value(0.0), 0);
        assert_eq!(percent_to_dac_value(100.0), 255);
        assert_eq!(percent_to_dac_value(50.0), 128);
    }

    #[test]
    fn linear_map_clamps_out_of_range_input() {
        assert_eq!(percent_to_dac_value(-10.0), 0);
        assert_eq!(percent_to_dac_value(150.0), 255);
    }
}
