//! Cross-task application handle (§5): the Weight, Operator and Telemetry
//! tasks in `main.rs` each hold a clone of this, while the Control task owns
//! the authoritative fill/auto-tune/PID state exclusively and is reachable
//! only through `control_tx`.
//!
//! Grounded on the teacher's `app_state.rs` `System`: a `Clone` struct of
//! `Arc<Mutex/RwLock<T>>` handles plus the `report_*_event` methods and the
//! `#[macro_export] panic!/error!/warn!/info!/debug!/trace!` logging macros,
//! kept essentially verbatim since `schemas::event::EventBuffer` is
//! unchanged from the teacher's.

use crate::config::Config;
use crate::control::actor::{ControlCommand, Shared, WeightReading};
use crate::schemas::event::EventBuffer;
use crate::schemas::status::StatusReport;
use crate::types::Percent;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Clone)]
pub struct System {
    pub weight: Arc<RwLock<WeightReading>>,
    pub status: Arc<RwLock<StatusReport>>,
    pub display_lines: Arc<RwLock<(String, String)>>,
    pub events: Arc<Mutex<EventBuffer>>,
    pub config: Arc<RwLock<Config>>,
    pub commanded_pct: Arc<RwLock<Percent>>,
    pub mqtt_connected: Arc<AtomicBool>,
    pub control_tx: Sender<ControlCommand>,
}

impl System {
    /// Builds the handles the Control task publishes into (via `shared()`),
    /// seeded with a default `StatusReport`/`WeightReading` before the
    /// Control task itself exists. `control_tx` comes from
    /// `control::actor::spawn`, called by `main.rs` just before this.
    pub fn new(config: Config, fill_number_seed: u64, control_tx: Sender<ControlCommand>) -> Self {
        let status = StatusReport::new(
            Default::default(),
            None,
            0.0,
            config.fill.default_target_lbs,
            0.0,
            0,
            0.0,
            fill_number_seed,
            false,
            false,
            false,
            Default::default(),
        );

        System {
            weight: Arc::new(RwLock::new(WeightReading::default())),
            status: Arc::new(RwLock::new(status)),
            display_lines: Arc::new(RwLock::new(("Starting...".to_string(), String::new()))),
            events: Arc::new(Mutex::new(EventBuffer::new())),
            config: Arc::new(RwLock::new(config)),
            commanded_pct: Arc::new(RwLock::new(0.0)),
            mqtt_connected: Arc::new(AtomicBool::new(false)),
            control_tx,
        }
    }

    /// The `Shared` view the Control task actually writes through. Kept as
    /// a distinct type from `System` since the Control task must never hold
    /// its own `control_tx` — it is the mailbox's receiving end, not a
    /// sender into itself.
    pub fn shared(&self) -> Shared {
        Shared {
            weight: self.weight.clone(),
            status: self.status.clone(),
            display_lines: self.display_lines.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            commanded_pct: self.commanded_pct.clone(),
            mqtt_connected: self.mqtt_connected.clone(),
        }
    }

    pub fn status_snapshot(&self) -> StatusReport {
        self.status.read().unwrap().clone()
    }

    pub fn report_panic_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().panic(source, message);
    }

    pub fn report_error_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().error(source, message);
    }

    pub fn report_warn_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().warn(source, message);
    }

    pub fn report_info_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().info(source, message);
    }

    #[allow(dead_code)]
    pub fn report_debug_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().debug(source, message);
    }

    #[allow(dead_code)]
    pub fn report_trace_event(&self, source: &str, message: String) {
        self.events.lock().unwrap().trace(source, message);
    }
}

#[macro_export]
macro_rules! panic {
    ($self:expr, $($arg:tt)*) => {
        $self.report_panic_event(module_path!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! error {
    ($self:expr, $($arg:tt)*) => {
        $self.report_error_event(module_path!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn {
    ($self:expr, $($arg:tt)*) => {
        $self.report_warn_event(module_path!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! info {
    ($self:expr, $($arg:tt)*) => {
        $self.report_info_event(module_path!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! debug {
    ($self:expr, $($arg:tt)*) => {
        $self.report_debug_event(module_path!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace {
    ($self:expr, $($arg:tt)*) => {
        $self.report_trace_event(module_path!(), format!($($arg)*));
    };
}
