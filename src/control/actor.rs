//! The Control task's actor (§5): owns the Fill Controller, Auto-Tune
//! Engine, PID parameters, pressure actuator and parameter store
//! exclusively, drains a mailbox of operator/REST commands once per tick,
//! then runs whichever control law is currently active and publishes a
//! fresh `StatusReport` snapshot for the other three tasks to read.
//!
//! Grounded on the teacher's `components/pump.rs` actor: `Mailbox =
//! Sender<Message>`, a background thread that drains `rx.try_recv()` each
//! loop iteration before running its own state machine. That pattern is
//! generalised here from an event-only consumer to a fixed-rate loop, since
//! spec.md's Control task is rate-monotonic rather than purely reactive
//! (`components/boiler.rs`'s `loop { ...; FreeRtos::delay_ms(...) }` is the
//! closer precedent for the fixed-period half of this).

use crate::config::Config;
use crate::control::autotune::{AutotuneDriver, AutotuneOutcome};
use crate::control::fill_controller::FillController;
use crate::control::pid::PidParams;
use crate::control::safety::{SafetyOutcome, SafetySequencer};
use crate::ports::command_port::Command;
use crate::ports::parameter_store::ParameterStore;
use crate::ports::pressure_actuator::PressureActuator;
use crate::schemas::event::EventBuffer;
use crate::schemas::fill_record::FillRecord;
use crate::schemas::status::StatusReport;
use crate::state_machines::fill_fsm::FillMode;
use crate::types::{Percent, Pounds};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Fixed Control-task period (§5).
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct WeightReading {
    pub lbs: Pounds,
    pub online: bool,
}

impl Default for WeightReading {
    fn default() -> Self {
        WeightReading {
            lbs: 0.0,
            online: false,
        }
    }
}

/// Mailbox message shape. A near-mirror of `ports::command_port::Command`,
/// plus `SafetyConfirm` for the debounced confirm edge the Operator task
/// observes and forwards (the Safety Sequencer itself lives here, not
/// behind a shared lock, since only the Control task ever ticks it).
pub enum ControlCommand {
    Start,
    Stop,
    SetTarget(Pounds),
    AdjustTarget(Pounds),
    SafetyConfirm(bool),
    StartAutotune,
    CancelAutotune,
    AcceptAutotune,
    OperatorReset,
}

impl From<Command> for ControlCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => ControlCommand::Start,
            Command::Stop => ControlCommand::Stop,
            Command::SetTarget(t) => ControlCommand::SetTarget(t),
            Command::AdjustTarget(t) => ControlCommand::AdjustTarget(t),
            Command::StartAutotune => ControlCommand::StartAutotune,
            Command::CancelAutotune => ControlCommand::CancelAutotune,
            Command::AcceptAutotune => ControlCommand::AcceptAutotune,
            Command::OperatorReset => ControlCommand::OperatorReset,
        }
    }
}

/// Cross-task handles the Control task publishes into every tick. Shared
/// with the Weight, Operator and Telemetry tasks; single-writer-per-field
/// throughout (§5) except `config`, which any task may read but only the
/// REST `update` handler ever writes.
#[derive(Clone)]
pub struct Shared {
    pub weight: Arc<RwLock<WeightReading>>,
    pub status: Arc<RwLock<StatusReport>>,
    pub display_lines: Arc<RwLock<(String, String)>>,
    pub events: Arc<Mutex<EventBuffer>>,
    pub config: Arc<RwLock<Config>>,
    /// Commanded percent, mirrored out so the `simulate`-feature Weight task
    /// can close the loop on `adapters::sim_weight::SimWeightSource` without
    /// the Control task giving up exclusive ownership of the actuator.
    pub commanded_pct: Arc<RwLock<Percent>>,
    /// Set by the MQTT connection-watcher thread; read here only to stamp
    /// `StatusReport.mqtt_connected` each tick.
    pub mqtt_connected: Arc<AtomicBool>,
}

enum Mode {
    Normal,
    Autotune,
}

struct ControlActor<A, P>
where
    A: PressureActuator,
    P: ParameterStore,
{
    rx: Receiver<ControlCommand>,
    fill_tx: Sender<FillRecord>,
    actuator: A,
    param_store: P,
    fill: FillController,
    autotune: AutotuneDriver,
    safety: SafetySequencer,
    pending_safety_confirm: bool,
    pid_params: PidParams,
    mode: Mode,
    shared: Shared,
}

/// Spawns the Control task and returns its mailbox and the channel on which
/// completed fills arrive for the Telemetry task to persist/publish.
pub fn spawn<A, P>(
    actuator: A,
    param_store: P,
    fill_number_seed: u64,
    shared: Shared,
) -> (Sender<ControlCommand>, Receiver<FillRecord>)
where
    A: PressureActuator + Send + 'static,
    P: ParameterStore + Send + 'static,
{
    let (control_tx, control_rx) = channel();
    let (fill_tx, fill_rx) = channel();

    let cfg = shared.config.read().unwrap().clone();
    let pid_params = param_store.load().unwrap_or_else(|_| PidParams {
        kp: cfg.pid.default_kp,
        ki: cfg.pid.default_ki,
        kd: cfg.pid.default_kd,
        tuned: false,
    });
    let now = Instant::now();

    let mut actor = ControlActor {
        rx: control_rx,
        fill_tx,
        actuator,
        param_store,
        fill: FillController::new(cfg.fill.default_target_lbs, fill_number_seed, now),
        autotune: AutotuneDriver::new(&cfg.autotune),
        safety: SafetySequencer::new(cfg.safety.stage_timeout),
        pending_safety_confirm: false,
        pid_params,
        mode: Mode::Normal,
        shared,
    };

    std::thread::Builder::new()
        .name("Control".to_string())
        .spawn(move || actor.run())
        .expect("failed to spawn Control task");

    (control_tx, fill_rx)
}

impl<A, P> ControlActor<A, P>
where
    A: PressureActuator,
    P: ParameterStore,
{
    fn run(&mut self) {
        loop {
            let tick_start = Instant::now();

            while let Ok(command) = self.rx.try_recv() {
                self.handle_command(command);
            }

            self.tick(tick_start);
            self.actuator.pump_output();

            let elapsed = tick_start.elapsed();
            if elapsed < TICK_PERIOD {
                std::thread::sleep(TICK_PERIOD - elapsed);
            }
        }
    }

    fn command_actuator(&mut self, pct: Percent) {
        let actual = self.actuator.set_percent(pct);
        *self.shared.commanded_pct.write().unwrap() = actual;
    }

    fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Start => match self.fill.request_start() {
                Ok(()) => self.safety.begin(Instant::now()),
                Err(e) => self.event_warn(format!("start rejected: {e}")),
            },
            ControlCommand::Stop => {
                let pct = self.fill.request_stop();
                self.command_actuator(pct);
                self.safety.cancel();
                if matches!(self.mode, Mode::Autotune) {
                    self.command_actuator(self.autotune.cancel());
                    self.mode = Mode::Normal;
                }
            }
            ControlCommand::SetTarget(target) => {
                let cfg = self.shared.config.read().unwrap().clone();
                if let Err(e) = self
                    .fill
                    .set_target(target, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs)
                {
                    self.event_warn(format!("set_target rejected: {e}"));
                }
            }
            ControlCommand::AdjustTarget(delta) => {
                let cfg = self.shared.config.read().unwrap().clone();
                self.fill
                    .adjust_target(delta, cfg.fill.min_target_lbs, cfg.fill.max_target_lbs);
            }
            ControlCommand::SafetyConfirm(edge) => {
                // Gated on SafetyCheck so a confirm press made while Idle,
                // Filling, or a terminal mode can't survive as a stale
                // phantom edge that auto-passes the *next* fill's first
                // safety stage.
                if edge && self.fill.mode() == FillMode::SafetyCheck {
                    self.pending_safety_confirm = true;
                }
            }
            ControlCommand::StartAutotune => {
                if self.fill.mode() == FillMode::Idle {
                    self.mode = Mode::Autotune;
                    let pct = self.autotune.start(Instant::now());
                    self.command_actuator(pct);
                } else {
                    self.event_warn("auto-tune rejected: fill controller not idle".to_string());
                }
            }
            ControlCommand::CancelAutotune => {
                let pct = self.autotune.cancel();
                self.command_actuator(pct);
                self.mode = Mode::Normal;
            }
            ControlCommand::AcceptAutotune => {
                if let Some(result) = self.autotune.take_result() {
                    self.pid_params = result.params;
                    if self.param_store.save(self.pid_params).is_err() {
                        self.event_error("failed to persist tuned PID gains".to_string());
                    }
                }
                self.mode = Mode::Normal;
            }
            ControlCommand::OperatorReset => self.fill.operator_reset(),
        }
    }

    fn tick(&mut self, now: Instant) {
        let weight = *self.shared.weight.read().unwrap();
        let cfg = self.shared.config.read().unwrap().clone();

        match self.mode {
            Mode::Autotune => self.tick_autotune(weight.lbs, now),
            Mode::Normal => self.tick_normal(weight, now, &cfg),
        }

        self.publish_status(&cfg, weight);
    }

    fn tick_autotune(&mut self, weight_lbs: Pounds, now: Instant) {
        let (pct, outcome) = self.autotune.tick(weight_lbs, now);
        self.command_actuator(pct);
        match outcome {
            AutotuneOutcome::Ok(_) => {
                self.event_info("auto-tune complete, awaiting operator acceptance".to_string());
                *self.shared.display_lines.write().unwrap() = (
                    "Auto-tune done".to_string(),
                    "Confirm to accept".to_string(),
                );
            }
            AutotuneOutcome::Failure if self.autotune.phase().is_terminal() => {
                self.event_warn("auto-tune failed".to_string());
                self.mode = Mode::Normal;
            }
            _ => {
                *self.shared.display_lines.write().unwrap() =
                    ("Auto-tuning...".to_string(), format!("{:.1} lbs", weight_lbs));
            }
        }
    }

    fn tick_normal(&mut self, weight: WeightReading, now: Instant, cfg: &Config) {
        match self.fill.mode() {
            FillMode::SafetyCheck => {
                let edge = std::mem::take(&mut self.pending_safety_confirm);
                let outcome = self.safety.tick(edge, now);
                let phase = self.safety.phase();
                if matches!(outcome, SafetyOutcome::Passed | SafetyOutcome::Failed) {
                    let pct = self.fill.on_safety_phase(phase, weight.lbs, now);
                    self.command_actuator(pct);
                }
                let (line1, line2) = self.safety.prompt();
                *self.shared.display_lines.write().unwrap() = (line1.to_string(), line2.to_string());
            }
            FillMode::Filling => {
                let feedback = self.actuator.get_feedback();
                let out = self.fill.tick_filling(
                    weight.lbs,
                    weight.online,
                    feedback,
                    now,
                    cfg,
                    self.pid_params,
                    cfg.fill.pid_enabled,
                );
                self.command_actuator(out.pressure_cmd_pct);
                if let Some(record) = out.fill_record {
                    self.event_info(format!("fill #{} complete", record.fill_number));
                    let _ = self.fill_tx.send(record);
                }
                *self.shared.display_lines.write().unwrap() = (
                    format!("Fill: {:.1}/{:.1} lbs", weight.lbs, self.fill.target_lbs()),
                    format!("Zone: {}", self.fill.active_zone()),
                );
            }
            mode => {
                self.command_actuator(0.0);
                *self.shared.display_lines.write().unwrap() = idle_prompt(mode, self.fill.target_lbs());
            }
        }
    }

    fn publish_status(&self, cfg: &Config, weight: WeightReading) {
        let zone = match self.fill.mode() {
            FillMode::Filling => Some(self.fill.active_zone()),
            _ => None,
        };
        let report = StatusReport::new(
            self.fill.mode(),
            zone,
            weight.lbs,
            self.fill.target_lbs(),
            self.fill.pressure_cmd_pct(),
            self.fill.fills_today(),
            self.fill.total_lbs_today(),
            self.fill.fill_number(),
            weight.online,
            self.shared.mqtt_connected.load(Ordering::Relaxed),
            self.actuator.get_feedback(),
            self.fill.stats(),
        );
        *self.shared.status.write().unwrap() = report;
    }

    fn event_info(&self, message: String) {
        self.shared.events.lock().unwrap().info("control", message);
    }

    fn event_warn(&self, message: String) {
        self.shared.events.lock().unwrap().warn("control", message);
    }

    fn event_error(&self, message: String) {
        self.shared.events.lock().unwrap().error("control", message);
    }
}

fn idle_prompt(mode: FillMode, target_lbs: Pounds) -> (String, String) {
    match mode {
        FillMode::Idle => ("Ready".to_string(), format!("Target: {:.1} lbs", target_lbs)),
        FillMode::Completed => ("Fill complete".to_string(), "Press to reset".to_string()),
        FillMode::Cancelled => ("Cancelled".to_string(), "Press to reset".to_string()),
        FillMode::Error(e) => (format!("ERROR: {}", e), "Press to reset".to_string()),
        FillMode::SafetyCheck | FillMode::Filling => (String::new(), String::new()),
    }
}
