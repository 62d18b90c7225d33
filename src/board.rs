//! Hardware wiring: claims `Peripherals::take()` once and assembles the
//! concrete `ports::*` adapters the rest of the crate drives through traits.
//! Grounded on the teacher's own `Board::new`, which does the same
//! peripheral-claiming/pin-assignment dance for its own (unrelated) set of
//! sensors and actuators; the `simulate` half mirrors how the teacher's
//! `models::auto_tune` simulation path stands in for hardware in tests.

#[cfg(not(feature = "simulate"))]
mod real {
    use crate::adapters::dac_actuator::DacActuator;
    use crate::adapters::operator_io::GpioOperatorIo;
    use crate::adapters::serial_scale::SerialScale;
    use esp_idf_svc::hal::gpio::{Gpio25, Gpio26};
    use esp_idf_svc::hal::prelude::Peripherals;
    use std::time::Duration;

    /// DAC's software-PWM standing-in period (§4.2's command has no rate
    /// limit of its own; this is purely how fine-grained the duty cycle is).
    const PWM_PERIOD: Duration = Duration::from_millis(20);

    pub struct Board {
        pub scale: SerialScale<'static>,
        pub actuator: DacActuator<'static, Gpio25, Gpio26>,
        pub operator_io: GpioOperatorIo,
    }

    impl Board {
        pub fn new() -> anyhow::Result<Self> {
            let peripherals = Peripherals::take()?;

            log::info!("board: bringing up RS232 scale on uart1");
            let scale = SerialScale::new(
                peripherals.uart1,
                peripherals.pins.gpio17,
                peripherals.pins.gpio16,
            )?;

            log::info!("board: bringing up pressure actuator (PWM-DAC + feedback)");
            let actuator = DacActuator::new(
                peripherals.pins.gpio25,
                peripherals.pins.gpio26,
                PWM_PERIOD,
            )?;

            log::info!("board: bringing up operator panel (confirm/cancel/rotary)");
            let operator_io = GpioOperatorIo::new(
                peripherals.pins.gpio32,
                peripherals.pins.gpio33,
                peripherals.pins.gpio34,
                peripherals.pins.gpio27,
            )?;

            Ok(Board {
                scale,
                actuator,
                operator_io,
            })
        }
    }
}

#[cfg(not(feature = "simulate"))]
pub use real::Board;

#[cfg(feature = "simulate")]
mod simulated {
    use crate::adapters::sim_actuator::SimActuator;
    use crate::adapters::sim_operator_io::SimOperatorIo;
    use crate::adapters::sim_weight::SimWeightSource;

    pub struct Board {
        pub scale: SimWeightSource,
        pub actuator: SimActuator,
        pub operator_io: SimOperatorIo,
    }

    impl Board {
        pub fn new() -> anyhow::Result<Self> {
            Ok(Board {
                scale: SimWeightSource::new(0.0),
                actuator: SimActuator::new(),
                operator_io: SimOperatorIo::new(),
            })
        }
    }
}

#[cfg(feature = "simulate")]
pub use simulated::Board;
