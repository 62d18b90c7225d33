//! Process entry point (§5): brings up the board and persistent store, then
//! spawns the four periodic tasks spec.md's concurrency model names --
//! Weight, Control, Operator, Telemetry -- plus the REST and MQTT surfaces
//! of §6.
//!
//! Grounded on the teacher's own `main.rs`: `link_patches`/`EspLogger`
//! bring-up, `EspHttpServer::new` + `core::mem::forget(server)` to keep the
//! handler closures alive for the process lifetime, and one background
//! thread per concern rather than a single event loop. The Control task's
//! own thread is spawned by `control::actor::spawn`; this file owns the
//! other three.

#![allow(dead_code)]
mod adapters;
mod api;
mod app_state;
mod board;
mod config;
mod control;
mod gpio;
mod kv_store;
mod ports;
mod schemas;
mod state_machines;
mod types;

use anyhow::Result;
use app_state::System;
use board::Board;
use config::Config;
use control::actor::{ControlCommand, Shared, WeightReading, TICK_PERIOD};
use kv_store::KeyValueStore;
use ports::event_sink::{EventSink, LoggingEventSink};
use ports::operator_io::OperatorIo;
use ports::weight_source::WeightSample;
use schemas::fill_record::FillRecord;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

/// Operator task period (§5): safety-sequencer tick plus confirm/cancel/
/// rotary polling and display refresh.
const OPERATOR_PERIOD: Duration = Duration::from_millis(200);
/// Telemetry task poll period (§5); actual publish cadence is 5s while
/// Filling, 30s otherwise (`config::Mqtt`).
const TELEMETRY_POLL_PERIOD: Duration = Duration::from_secs(1);

/// No broker credentials are compiled in (SPEC_FULL §10.3 drops the
/// teacher's `dotenv_codegen` dependency, since the abstract event sink
/// needs none to model); the broker address is an optional runtime override
/// over a compile-time default, in the `boiler_pid.rs` precedent's style.
fn mqtt_broker_url() -> String {
    std::env::var("PUMP_MQTT_URL").unwrap_or_else(|_| "mqtt://127.0.0.1:1883".to_string())
}

fn mqtt_client_id() -> String {
    std::env::var("PUMP_MQTT_CLIENT_ID").unwrap_or_else(|_| "pump_fill_controller".to_string())
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let logger = esp_idf_svc::log::EspLogger;
    logger.set_target_level("*", log::LevelFilter::Info).unwrap();
    logger
        .set_target_level("rmt(legacy)", log::LevelFilter::Warn)
        .unwrap();
    logger.set_target_level("efuse", log::LevelFilter::Warn).unwrap();

    log::info!("pump-fill-controller: starting up");

    let config = Config::load_or_default();

    let param_store = KeyValueStore::new_blocking(Duration::from_secs(5))
        .expect("parameter store must come up before the Control task can start");
    let fill_number_seed = param_store.load_fill_number();

    let Board {
        scale,
        actuator,
        operator_io,
    } = Board::new()?;

    // `System::new` needs a `control_tx` to fill in, but the real sender only
    // exists once `control::actor::spawn` has built the `Shared` handles this
    // same `System` owns; bridge the two with a throwaway channel, then
    // overwrite the field once the Control task's mailbox exists.
    let (placeholder_tx, _placeholder_rx) = std::sync::mpsc::channel();
    let mut system = System::new(config, fill_number_seed, placeholder_tx);

    let (control_tx, fill_rx) =
        control::actor::spawn(actuator, param_store, fill_number_seed, system.shared());
    system.control_tx = control_tx;

    let server = api::rest::create_server(system.clone())?;
    core::mem::forget(server);

    let event_sink: Box<dyn EventSink + Send> = match api::mqtt::MqttEventSink::connect(
        &mqtt_broker_url(),
        &mqtt_client_id(),
        system.config.read().unwrap().mqtt.clone(),
        system.mqtt_connected.clone(),
    ) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            log::warn!("mqtt: connect failed ({:?}), falling back to log-only event sink", e);
            Box::new(LoggingEventSink)
        }
    };

    spawn_weight_task(scale, system.shared());
    spawn_operator_task(operator_io, system.clone());
    spawn_telemetry_task(event_sink, system.clone(), fill_rx);

    log::info!("pump-fill-controller: all tasks running");
    loop {
        thread::sleep(Duration::from_secs(3600));
    }
}

#[cfg(feature = "simulate")]
fn spawn_weight_task(mut scale: adapters::sim_weight::SimWeightSource, shared: Shared) {
    thread::Builder::new()
        .name("Weight".to_string())
        .spawn(move || loop {
            let tick_start = Instant::now();

            let commanded_pct = *shared.commanded_pct.read().unwrap();
            scale.drive(commanded_pct);
            publish_weight_sample(scale.read(), &shared);

            sleep_remainder(tick_start, TICK_PERIOD);
        })
        .expect("failed to spawn Weight task");
}

#[cfg(not(feature = "simulate"))]
fn spawn_weight_task(mut scale: adapters::serial_scale::SerialScale<'static>, shared: Shared) {
    thread::Builder::new()
        .name("Weight".to_string())
        .spawn(move || loop {
            let tick_start = Instant::now();
            publish_weight_sample(scale.read(), &shared);
            sleep_remainder(tick_start, TICK_PERIOD);
        })
        .expect("failed to spawn Weight task");
}

/// Single-writer update of `shared.weight` (§5): a reading replaces both
/// fields; an unavailable sample only clears `online`, leaving the last
/// filtered weight in place for the Control task to keep using transiently.
fn publish_weight_sample(sample: WeightSample, shared: &Shared) {
    match sample {
        WeightSample::Reading(lbs) => {
            *shared.weight.write().unwrap() = WeightReading { lbs, online: true };
        }
        WeightSample::Unavailable => {
            shared.weight.write().unwrap().online = false;
        }
    }
}

/// Safety-sequencer tick, confirm/cancel/rotary polling and display refresh
/// (§4.7, §6 Operator I/O), at the 200ms Operator-task rate.
fn spawn_operator_task(mut operator_io: impl OperatorIo + Send + 'static, system: System) {
    thread::Builder::new()
        .name("Operator".to_string())
        .spawn(move || loop {
            let tick_start = Instant::now();

            if operator_io.poll_confirm() {
                // Harmless no-op wherever it doesn't apply: the Control task
                // only consumes `SafetyConfirm` during `SafetyCheck` and
                // `OperatorReset` only from a terminal mode (§7).
                let _ = system.control_tx.send(ControlCommand::SafetyConfirm(true));
                let _ = system.control_tx.send(ControlCommand::OperatorReset);
            }
            if operator_io.poll_cancel() {
                let _ = system.control_tx.send(ControlCommand::Stop);
            }
            let detents = operator_io.poll_rotary_delta();
            if detents != 0 {
                let increment = system.config.read().unwrap().fill.target_increment_lbs;
                let _ = system
                    .control_tx
                    .send(ControlCommand::AdjustTarget(detents as f32 * increment));
            }

            let (line1, line2) = system.display_lines.read().unwrap().clone();
            operator_io.display(&line1, &line2);

            sleep_remainder(tick_start, OPERATOR_PERIOD);
        })
        .expect("failed to spawn Operator task");
}

/// Status/fill/event publishing (§5, §6): drains completed fills and
/// operator events as they arrive, and publishes a status snapshot on the
/// 5s (Filling) / 30s (otherwise) cadence from `config::Mqtt`.
fn spawn_telemetry_task(mut sink: Box<dyn EventSink + Send>, system: System, fill_rx: Receiver<FillRecord>) {
    thread::Builder::new()
        .name("Telemetry".to_string())
        .spawn(move || {
            let mut last_status_publish = Instant::now() - Duration::from_secs(3600);
            loop {
                let tick_start = Instant::now();

                while let Ok(record) = fill_rx.try_recv() {
                    sink.publish_fill(&record);
                }

                let drained_events = {
                    let mut events = system.events.lock().unwrap();
                    std::mem::take(&mut events.events)
                };
                for event in &drained_events {
                    sink.publish_event(event);
                }

                let status = system.status_snapshot();
                let cfg = system.config.read().unwrap().clone();
                let interval = if status.state == "Filling" {
                    cfg.mqtt.status_interval_filling
                } else {
                    cfg.mqtt.status_interval_idle
                };
                if last_status_publish.elapsed() >= interval {
                    sink.publish_status(&status);
                    last_status_publish = Instant::now();
                }

                sleep_remainder(tick_start, TELEMETRY_POLL_PERIOD);
            }
        })
        .expect("failed to spawn Telemetry task");
}

fn sleep_remainder(tick_start: Instant, period: Duration) {
    let elapsed = tick_start.elapsed();
    if elapsed < period {
        thread::sleep(period - elapsed);
    }
}
