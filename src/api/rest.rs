//! REST surface (§6): `GET /status`, `POST /start`, `POST /stop`,
//! `POST /set_target`. Grounded on the teacher's `api/rest.rs`: the same
//! `handle_request_data!`/`ok!`/`bad_request!` macros, the same
//! `EspHttpServer::new(&Configuration{stack_size,..})` + `fn_handler`
//! routing idiom, generalised from the teacher's drink/echo endpoints to
//! the fill-controller command surface.

use crate::app_state::System;
use crate::ports::command_port::{Command, CommandError, CommandPort};
use embedded_svc::{
    http::{Headers, Method},
    io::{Read, Write},
};
use esp_idf_svc::http::server::EspHttpServer;
use serde::Deserialize;

const STACK_SIZE: usize = 1024 * 10;
const MAX_LEN: usize = 2048;
const VERSION: &str = env!("CARGO_PKG_VERSION");

macro_rules! handle_request_data {
    ($req:expr) => {{
        let len = $req.content_len().unwrap_or(0) as usize;

        if len > MAX_LEN {
            $req.into_status_response(413)?
                .write_all("Request too big".as_bytes())?;
            return Ok(());
        }
        let mut buf = vec![0; len];
        $req.read_exact(&mut buf)?;
        String::from_utf8(buf).unwrap()
    }};
}

macro_rules! success {
    () => {
        Ok(serde_json::json!({ "status": "success" }).to_string())
    };
}

macro_rules! ok {
    ($req:expr, $resp:expr) => {{
        $req.into_ok_response()?.write_all($resp.as_bytes())?;
    }};
}

macro_rules! bad_request {
    ($req:expr, $err:expr) => {{
        $req.into_status_response(400)?
            .write_all($err.to_string().as_bytes())?;
    }};
}

/// Dispatches commands by an optimistic pre-check against the last
/// published `StatusReport` snapshot, then forwards fire-and-forget through
/// `System::control_tx`. The Control task owns `FillController` on its own
/// thread (not behind a shared `Mutex`), so a synchronous reply would mean
/// blocking the HTTP handler on the next 100ms tick; instead the Control
/// task re-validates authoritatively and logs a warning on any race-window
/// rejection (see DESIGN.md).
#[derive(Clone)]
pub struct RestDispatcher {
    system: System,
}

impl RestDispatcher {
    pub fn new(system: System) -> Self {
        RestDispatcher { system }
    }
}

impl CommandPort for RestDispatcher {
    fn dispatch(&self, command: Command) -> Result<(), CommandError> {
        let status = self.system.status_snapshot();
        let idle = status.state == "Idle";

        match command {
            Command::Start if !idle => return Err(CommandError::NotIdle),
            Command::SetTarget(target) | Command::AdjustTarget(target) if !idle => {
                let _ = target;
                return Err(CommandError::NotIdle);
            }
            Command::SetTarget(target) => {
                let cfg = self.system.config.read().unwrap();
                if target < cfg.fill.min_target_lbs || target > cfg.fill.max_target_lbs {
                    return Err(CommandError::OutOfRange);
                }
            }
            _ => {}
        }

        let _ = self.system.control_tx.send(command.into());
        Ok(())
    }

    fn status(&self) -> crate::schemas::status::StatusReport {
        self.system.status_snapshot()
    }
}

pub fn create_server(system: System) -> anyhow::Result<EspHttpServer<'static>> {
    let server_configuration = esp_idf_svc::http::server::Configuration {
        stack_size: STACK_SIZE,
        ..Default::default()
    };

    let mut server = EspHttpServer::new(&server_configuration)?;
    create_router(&mut server, system)?;
    Ok(server)
}

fn create_router(server: &mut EspHttpServer<'static>, system: System) -> anyhow::Result<()> {
    server.fn_handler("/api/v1/version", Method::Get, |req| {
        req.into_ok_response()?.write_all(VERSION.as_bytes()).map(|_| ())
    })?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler("/api/v1/status", Method::Get, move |req| {
        let resp = dispatcher.status().to_json();
        req.into_ok_response()?.write_all(resp.as_bytes()).map(|_| ())
    })?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler::<anyhow::Error, _>("/api/v1/start", Method::Post, move |req| {
        match dispatcher.dispatch(Command::Start) {
            Ok(()) => ok!(req, "started"),
            Err(e) => bad_request!(req, e),
        }
        Ok(())
    })?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler::<anyhow::Error, _>("/api/v1/stop", Method::Post, move |req| {
        match dispatcher.dispatch(Command::Stop) {
            Ok(()) => ok!(req, "stopped"),
            Err(e) => bad_request!(req, e),
        }
        Ok(())
    })?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler::<anyhow::Error, _>(
        "/api/v1/set_target",
        Method::Post,
        move |mut req| {
            let data = handle_request_data!(req);
            match set_target(&data, &dispatcher) {
                Ok(message) => ok!(req, message),
                Err(e) => bad_request!(req, e),
            }
            Ok(())
        },
    )?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler::<anyhow::Error, _>("/api/v1/autotune/start", Method::Post, move |req| {
        match dispatcher.dispatch(Command::StartAutotune) {
            Ok(()) => ok!(req, "autotune started"),
            Err(e) => bad_request!(req, e),
        }
        Ok(())
    })?;

    let dispatcher = RestDispatcher::new(system.clone());
    server.fn_handler::<anyhow::Error, _>("/api/v1/autotune/accept", Method::Post, move |req| {
        match dispatcher.dispatch(Command::AcceptAutotune) {
            Ok(()) => ok!(req, "autotune accepted"),
            Err(e) => bad_request!(req, e),
        }
        Ok(())
    })?;

    let dispatcher = RestDispatcher::new(system);
    server.fn_handler::<anyhow::Error, _>("/api/v1/autotune/cancel", Method::Post, move |req| {
        match dispatcher.dispatch(Command::CancelAutotune) {
            Ok(()) => ok!(req, "autotune cancelled"),
            Err(e) => bad_request!(req, e),
        }
        Ok(())
    })?;

    Ok(())
}

#[derive(Deserialize)]
struct SetTargetRequest {
    target_lbs: f32,
}

fn set_target(data: &str, dispatcher: &RestDispatcher) -> Result<String, String> {
    let req: SetTargetRequest = serde_json::from_str(data).map_err(|e| e.to_string())?;
    dispatcher
        .dispatch(Command::SetTarget(req.target_lbs))
        .map_err(|e| e.to_string())?;
    success!()
}
