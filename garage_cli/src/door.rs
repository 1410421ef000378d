//! Door assembly and command execution: config mapping, backend selection,
//! runtime wiring.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use garage_core::pulse::PulseDriver;
use garage_core::signal::drive_level;
use garage_core::{
    DoorCfg, DoorController, DoorHandle, DoorStatus, FileStore, GarageError, Persistence,
    Runtime, TargetState, WebhookCfg, WebhookFilter, WebhookServer,
};
use garage_traits::{Clock, MonotonicClock};

use crate::cli::JSON_MODE;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub type Backend = garage_hardware::RpiGpio;
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub type Backend = garage_hardware::SimulatedGpio;

/// Read and validate the config. Every failure here is a configuration error.
pub fn load_config(path: &Path) -> eyre::Result<garage_config::Config> {
    garage_config::load_path(path).map_err(|e| GarageError::Config(e.to_string()).into())
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn make_gpio(_cfg: &garage_config::Config) -> eyre::Result<Backend> {
    garage_hardware::RpiGpio::new()
        .map_err(|e| GarageError::Hardware(format!("open gpio: {e}")).into())
}

/// Simulated backend. `GARAGE_SIM_INPUT=1` drives the door input high before
/// startup, standing in for a closed reed switch on the bench.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn make_gpio(cfg: &garage_config::Config) -> eyre::Result<Backend> {
    let gpio = garage_hardware::SimulatedGpio::new();
    if let (Some(pin), Ok(level)) = (cfg.pins.state, std::env::var("GARAGE_SIM_INPUT")) {
        gpio.set_input(pin, matches!(level.trim(), "1" | "high" | "true"));
    }
    Ok(gpio)
}

fn open_store(cfg: &garage_config::Config) -> eyre::Result<FileStore> {
    FileStore::open(&cfg.storage.dir).map_err(|e| {
        GarageError::Persistence(format!("open state dir {}: {e}", cfg.storage.dir)).into()
    })
}

fn clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(MonotonicClock::new())
}

/// Controller with pins up and the persisted command resumed.
fn started_runtime(cfg: &garage_config::Config) -> eyre::Result<Runtime<Backend, FileStore>> {
    let door = DoorCfg::from(cfg);
    let mut ctl = DoorController::new(door, make_gpio(cfg)?, open_store(cfg)?, clock());
    ctl.start().wrap_err("start door controller")?;
    Ok(Runtime::new(ctl))
}

fn install_ctrlc(handle: DoorHandle) -> eyre::Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received");
        let _ = handle.shutdown();
    })
    .wrap_err("install Ctrl-C handler")
}

pub fn status_json(name: &str, s: &DoorStatus) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "current": s.current.as_str(),
        "target": s.target.as_str(),
        "obstruction": s.obstruction,
    })
}

pub fn print_status(name: &str, s: &DoorStatus) {
    if JSON_MODE.get().copied().unwrap_or(false) {
        println!("{}", status_json(name, s));
    } else {
        println!("{name}: current={} target={}", s.current, s.target);
    }
}

/// One command, then serve timers until nothing is armed.
pub fn run_command(cfg: &garage_config::Config, target: TargetState) -> eyre::Result<DoorStatus> {
    let mut rt = started_runtime(cfg)?;
    let handle = rt.handle();
    install_ctrlc(handle.clone())?;
    handle.set_target(target)?;
    let status = rt.run_until_idle();
    tracing::info!(current = %status.current, target = %status.target, "door settled");
    Ok(status)
}

/// Persisted record only; no pin is touched.
pub fn read_status(cfg: &garage_config::Config) -> eyre::Result<DoorStatus> {
    let rec = Persistence::new(open_store(cfg)?).load();
    Ok(DoorStatus {
        current: rec.current,
        target: rec.target,
        obstruction: false,
    })
}

pub fn self_check(cfg: &garage_config::Config) -> eyre::Result<()> {
    open_store(cfg)?;
    let mut pins = PulseDriver::new(make_gpio(cfg)?, cfg.output.reverse, clock());
    pins.init_output(cfg.pins.open)
        .wrap_err_with(|| format!("init output pin {}", cfg.pins.open))?;
    if cfg.input.enabled
        && let Some(pin) = cfg.pins.state
    {
        pins.init_input(pin)
            .wrap_err_with(|| format!("init input pin {pin}"))?;
        let level = pins.read_level(pin)?;
        tracing::info!(pin, level, "door input readable");
    }
    if cfg.webhook.enabled {
        WebhookFilter::new(&WebhookCfg::from(&cfg.webhook))?;
    }
    tracing::info!(
        pin = cfg.pins.open,
        idle_high = drive_level(false, cfg.output.reverse),
        "self-check passed"
    );
    Ok(())
}

fn spawn_stdin_reader(name: String, handle: DoorHandle) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let cmd = line.trim();
            let sent = match cmd {
                "" => continue,
                "status" => match handle.status(Duration::from_secs(2)) {
                    Ok(s) => {
                        print_status(&name, &s);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                "quit" | "exit" => handle.shutdown(),
                other => match other.parse::<TargetState>() {
                    Ok(t) => handle.set_target(t),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring stdin command");
                        Ok(())
                    }
                },
            };
            if sent.is_err() {
                break;
            }
        }
        // Daemons often run with stdin closed; EOF is not a shutdown request
        tracing::debug!("stdin closed");
    });
}

/// Serve until Ctrl-C or `quit`.
pub fn run_daemon(cfg: &garage_config::Config) -> eyre::Result<DoorStatus> {
    let mut rt = started_runtime(cfg)?;
    rt.watch_input().wrap_err("watch door input")?;
    let handle = rt.handle();
    install_ctrlc(handle.clone())?;

    let _webhook = if cfg.webhook.enabled {
        Some(WebhookServer::spawn(&WebhookCfg::from(&cfg.webhook), handle.clone())?)
    } else {
        None
    };
    spawn_stdin_reader(cfg.name.clone(), handle);

    rt.run();
    Ok(rt.controller().status())
}
