//! Weight Source (§4.1, §6) backed by the scale's RS232 ASCII protocol.
//!
//! Grounded on `original_source/components/scale_driver/scale_driver.c`
//! (`scale_read_weight`, `parse_weight_response`): 9600 8N1, lines shaped
//! like `"WT:+000.00 LBS\r\n"`, a 100ms read timeout standing in for "no
//! bytes arrived", and the same [-10.0, 500.0] lbs sanity band. The UART
//! wiring itself follows the teacher's `sensors::scale::Scale` in shape
//! (a polled wrapper owning its `PinDriver`s / here an `UartDriver`) even
//! though the teacher's own scale is an HX711 load cell, not a serial one;
//! the serial framing is this spec's actual weight source (§6).

use crate::adapters::weight_parse::parse_weight_line;
use crate::ports::weight_source::{WeightSample, WeightSource};
use esp_idf_svc::hal::gpio::{InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use std::time::Duration;

const READ_TIMEOUT_MS: u32 = 100;
const RX_BUF_LEN: usize = 256;

pub struct SerialScale<'a> {
    uart: UartDriver<'a>,
    rx_buf: [u8; RX_BUF_LEN],
}

impl<'a> SerialScale<'a> {
    pub fn new<UART: uart::Uart>(
        uart: impl Peripheral<P = UART> + 'a,
        tx: impl Peripheral<P = impl OutputPin> + 'a,
        rx: impl Peripheral<P = impl InputPin> + 'a,
    ) -> anyhow::Result<Self> {
        let config = uart::config::Config::new().baudrate(Hertz(9_600));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<esp_idf_svc::hal::gpio::AnyIOPin>::None,
            Option::<esp_idf_svc::hal::gpio::AnyIOPin>::None,
            &config,
        )?;
        Ok(SerialScale {
            uart,
            rx_buf: [0u8; RX_BUF_LEN],
        })
    }
}

impl<'a> WeightSource for SerialScale<'a> {
    fn read(&mut self) -> WeightSample {
        match self.uart.read(&mut self.rx_buf, READ_TIMEOUT_MS) {
            Ok(0) | Err(_) => WeightSample::Unavailable,
            Ok(len) => match std::str::from_utf8(&self.rx_buf[..len]) {
                Ok(text) => match parse_weight_line(text) {
                    Some(w) => WeightSample::Reading(w),
                    None => WeightSample::Unavailable,
                },
                Err(_) => WeightSample::Unavailable,
            },
        }
    }

    fn tare(&mut self) {
        // The PS-IN202 protocol has no documented remote-tare command; the
        // scale's own front-panel zero is the source of truth. This is a
        // no-op that still satisfies the trait's idempotence requirement.
        log::info!("scale: tare requested (no-op, no remote tare command)");
    }
}

/// Blocks up to `timeout` waiting for the first successful reading, the way
/// the teacher's `board.rs` blocks on `loadcell.is_ready()` during startup.
pub fn wait_for_ready(scale: &mut SerialScale, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if matches!(scale.read(), WeightSample::Reading(_)) {
            return true;
        }
    }
    false
}

