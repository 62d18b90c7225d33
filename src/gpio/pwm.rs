//! Software PWM: toggles a GPIO output on a fixed interval at a settable duty
//! cycle. Used by `adapters::dac_actuator` to stand in for the 8-bit DAC the
//! HAL on this board generation doesn't expose (see that module's doc
//! comment). Carried over unchanged from the boiler/pump duty-cycle driver
//! this crate's hardware layer was built from.

use esp_idf_svc::hal::gpio::{Output, OutputPin, PinDriver};
use std::time::{Duration, Instant};

pub struct Pwm<'a, PD: OutputPin> {
    out: PinDriver<'a, PD, Output>,
    interval: Duration,
    on_time: Duration,
    start_of_interval: Instant,
    invert: bool,
}

impl<'a, PD> std::fmt::Display for Pwm<'a, PD>
where
    PD: OutputPin,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pwm: on_time: {:?}, interval: {:?}, invert: {}",
            self.on_time, self.interval, self.invert
        )
    }
}

impl<'a, PD> Pwm<'a, PD>
where
    PD: OutputPin,
{
    pub fn new(pin: PD, interval: Duration, invert: Option<bool>) -> Self {
        Pwm {
            out: PinDriver::output(pin).unwrap(),
            interval,
            on_time: Duration::from_secs(0),
            start_of_interval: Instant::now(),
            invert: invert.unwrap_or(false),
        }
    }

    pub fn set_duty_cycle(&mut self, duty_cycle: f32) {
        let duty_cycle = duty_cycle.clamp(0.0, 1.0);
        self.on_time = self.duty_cycle_to_on_time(duty_cycle, None);
    }

    pub fn get_duty_cycle(&self) -> f32 {
        self.on_time_to_duty_cycle(None, None)
    }

    fn on_time_to_duty_cycle(&self, on_time: Option<Duration>, interval: Option<Duration>) -> f32 {
        let on_time = on_time.unwrap_or(self.on_time);
        let interval = interval.unwrap_or(self.interval);
        on_time.as_secs_f32() / interval.as_secs_f32()
    }

    fn duty_cycle_to_on_time(&self, duty_cycle: f32, interval: Option<Duration>) -> Duration {
        let interval = interval.unwrap_or(self.interval);
        Duration::from_secs_f32(interval.as_secs_f32() * duty_cycle)
    }

    fn set_on(&mut self) {
        match self.invert {
            true => self.out.set_low(),
            false => self.out.set_high(),
        }
        .expect("failed to set pwm output on");
    }

    fn set_off(&mut self) {
        match self.invert {
            true => self.out.set_high(),
            false => self.out.set_low(),
        }
        .expect("failed to set pwm output off");
    }

    /// Advances the PWM state machine. Must be called frequently relative to
    /// `interval` (the Control task's own tick period is used for this, see
    /// `adapters::dac_actuator::DacActuator::pump_output`).
    pub fn tick(&mut self) -> Option<Duration> {
        if self.on_time == Duration::from_secs(0) {
            self.set_off();
            return None;
        }

        if self.on_time == self.interval {
            self.set_on();
            return None;
        }

        let mut time_in_cycle = self.start_of_interval.elapsed();
        if time_in_cycle > self.interval {
            self.start_of_interval = Instant::now();
            time_in_cycle = Duration::from_secs(0);
        }

        let time_to_state_change = if time_in_cycle < self.on_time {
            self.set_on();
            self.on_time
        } else {
            self.set_off();
            self.interval - self.on_time
        };

        Some(time_to_state_change)
    }
}
