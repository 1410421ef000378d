//! Door state machine.
//!
//! `DoorController` owns the current/target state, the obstruction flag and
//! the timer table. It is the only place that decides when to pulse the
//! relay and when to arm or cancel timers. Every entry point runs to
//! completion before the next one starts; the event loop in `runtime`
//! guarantees that by owning the controller on a single thread.

use std::sync::Arc;
use std::time::Duration;

use garage_traits::{Clock, Gpio, StateStore};
use tracing::{debug, error, info, warn};

use crate::config::{DoorCfg, VIRTUAL_PULSE_PERIOD};
use crate::error::GarageError;
use crate::input::InputAdapter;
use crate::pulse::PulseDriver;
use crate::state::{DoorState, DoorStatus, TargetState};
use crate::status::{CommandOutcome, LogSink, StatusSink, StatusUpdate};
use crate::store::{PersistedRecord, Persistence};
use crate::timers::{TimerKind, TimerSet};

pub struct DoorController<G: Gpio, S: StateStore> {
    cfg: DoorCfg,
    pulse: PulseDriver<G>,
    persistence: Persistence<S>,
    sink: Box<dyn StatusSink>,
    timers: TimerSet,
    clock: Arc<dyn Clock + Send + Sync>,
    input: Option<InputAdapter>,
    current: DoorState,
    target: TargetState,
    obstruction: bool,
    // Last record known to be on disk; identical writes are skipped
    persisted: Option<PersistedRecord>,
}

impl<G: Gpio, S: StateStore> DoorController<G, S> {
    /// Seed state from `store`. No pin is touched until `start`.
    pub fn new(cfg: DoorCfg, gpio: G, store: S, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let persistence = Persistence::new(store);
        let rec = persistence.load();
        let input = cfg.input.map(InputAdapter::new);
        Self {
            pulse: PulseDriver::new(gpio, cfg.reverse_output, clock.clone()),
            persistence,
            sink: Box::new(LogSink),
            timers: TimerSet::new(),
            clock,
            input,
            current: rec.current,
            target: rec.target,
            obstruction: false,
            persisted: Some(rec),
            cfg,
        }
    }

    pub fn with_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Bring the pins up and reconcile with the outside world.
    ///
    /// Output init failure is fatal. With input tracking, the input pin is
    /// read once and fed through the input adapter. Then, if the seeded
    /// state is mid-travel, the persisted target is re-issued.
    pub fn start(&mut self) -> Result<(), GarageError> {
        self.pulse.init_output(self.cfg.open_pin)?;
        if let Some(input) = self.input {
            self.pulse.init_input(input.pin())?;
        }
        info!(
            door = %self.cfg.name,
            current = %self.current,
            target = %self.target,
            "door controller starting"
        );
        self.sink.publish(StatusUpdate::Current(self.current));
        self.sink.publish(StatusUpdate::Target(self.target));
        self.sink.publish(StatusUpdate::Obstruction(self.obstruction));

        if let Some(input) = self.input {
            match self.pulse.read_level(input.pin()) {
                Ok(high) => self.input_level(input.pin(), high),
                Err(e) => warn!(pin = input.pin(), error = %e, "initial input read failed"),
            }
        }
        self.resume();
        Ok(())
    }

    /// Re-execute the last command when the seeded state is mid-travel.
    /// Bypasses the move-guard: a persisted mid-travel state is "moving" by
    /// definition.
    pub fn resume(&mut self) -> Option<CommandOutcome> {
        if !self.is_moving() {
            return None;
        }
        info!(current = %self.current, target = %self.target, "resuming last command");
        Some(self.command(self.target))
    }

    pub fn is_moving(&self) -> bool {
        self.current != DoorState::from(self.target)
    }

    /// Host command entry point.
    pub fn set_target(&mut self, target: TargetState) -> CommandOutcome {
        if !self.cfg.allow_command_override && self.is_moving() {
            info!(
                requested = %target,
                current = %self.current,
                target = %self.target,
                "command ignored, door is moving"
            );
            self.sink.publish(StatusUpdate::Target(self.target));
            return CommandOutcome::RejectedMoving;
        }
        self.command(target)
    }

    fn command(&mut self, target: TargetState) -> CommandOutcome {
        if self.input.is_some() && self.current == DoorState::from(target) {
            if target == TargetState::Open && self.cfg.auto_close.is_some() {
                info!("door already open, restarting auto-close countdown");
                self.start_auto_close();
                return CommandOutcome::KeepOpen;
            }
            info!(requested = %target, "command ignored, door is already there");
            self.sink.publish(StatusUpdate::Target(self.target));
            return CommandOutcome::AlreadyThere;
        }
        self.apply(target);
        CommandOutcome::Accepted
    }

    fn apply(&mut self, target: TargetState) {
        let now = self.clock.now();
        debug!(door = %self.cfg.name, target = %target, "command accepted");
        self.timers.cancel(TimerKind::OpeningDelay);
        self.timers.cancel(TimerKind::MovingTimeout);
        self.set_target_state(target);
        match target {
            TargetState::Open => {
                self.set_current(DoorState::Opening);
                self.timers.cancel(TimerKind::AutoClose);
                self.cancel_virtual_opening();
                self.timers
                    .arm(TimerKind::OpeningDelay, now, self.cfg.opening_delay);
            }
            TargetState::Closed => {
                self.set_current(DoorState::Closing);
                self.timers.cancel(TimerKind::AutoClose);
                self.cancel_virtual_opening();
            }
        }
        self.persist();

        // Both directions share the one relay
        self.press();
        if target == TargetState::Closed {
            self.timers.arm(TimerKind::MovingTimeout, now, self.cfg.travel);
        }
    }

    /// An authoritative, settled observation from the input line or the
    /// webhook. Always wins over whatever was guessed.
    pub fn report_external(&mut self, observed: TargetState) {
        info!(observed = %observed, "external door state report");
        self.set_current(observed.into());
        self.set_target_state(observed);
        self.persist();
        self.timers.cancel(TimerKind::MovingTimeout);
        self.timers.cancel(TimerKind::OpeningDelay);
        match observed {
            TargetState::Open => self.start_auto_close(),
            TargetState::Closed => {
                self.timers.cancel(TimerKind::AutoClose);
                self.cancel_virtual_opening();
            }
        }
    }

    /// Raw level change from the input watcher; other pins are dropped.
    pub fn input_level(&mut self, pin: u8, high: bool) {
        let Some(adapter) = self.input else {
            debug!(pin, "input level ignored, input tracking disabled");
            return;
        };
        if let Some(observed) = adapter.observe(pin, high) {
            debug!(pin, high, "door input changed");
            self.report_external(observed);
        }
    }

    /// Run every timer due at the current instant, in deadline order.
    pub fn fire_due(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(kind) = self.timers.pop_due(now) {
            self.on_timer(kind);
            fired += 1;
        }
        fired
    }

    fn on_timer(&mut self, kind: TimerKind) {
        debug!(timer = %kind, "timer fired");
        match kind {
            TimerKind::OpeningDelay => {
                self.set_current(DoorState::Open);
                self.start_auto_close();
                self.persist();
            }
            TimerKind::MovingTimeout => {
                self.set_current(self.target.into());
                self.persist();
            }
            TimerKind::AutoClose => {
                info!("auto-close timer expired, closing");
                self.set_target(TargetState::Closed);
            }
            TimerKind::VirtualOpening => {
                info!("virtual opening window over, stopping hold-open pulses");
                self.timers.cancel(TimerKind::VirtualPulse);
            }
            TimerKind::VirtualPulse => {
                debug!("hold-open pulse");
                self.press();
            }
        }
    }

    /// No-op unless auto-close is configured.
    fn start_auto_close(&mut self) {
        let Some(ac) = self.cfg.auto_close else {
            return;
        };
        let now = self.clock.now();
        self.timers.arm(TimerKind::AutoClose, now, ac.delay);
        self.cancel_virtual_opening();
        if ac.virtual_opening_active() {
            debug!(
                window_s = ac.virtual_opening.as_secs(),
                "starting virtual opening"
            );
            self.timers.arm(TimerKind::VirtualOpening, now, ac.virtual_opening);
            self.timers
                .arm_periodic(TimerKind::VirtualPulse, now, VIRTUAL_PULSE_PERIOD);
        }
    }

    fn cancel_virtual_opening(&mut self) {
        self.timers.cancel(TimerKind::VirtualOpening);
        self.timers.cancel(TimerKind::VirtualPulse);
    }

    fn press(&mut self) {
        if let Err(e) = self.pulse.emit_pulse(self.cfg.open_pin, self.cfg.emit) {
            error!(pin = self.cfg.open_pin, error = %e, "relay pulse failed");
        }
    }

    fn set_current(&mut self, s: DoorState) {
        self.current = s;
        self.sink.publish(StatusUpdate::Current(s));
    }

    fn set_target_state(&mut self, t: TargetState) {
        self.target = t;
        self.sink.publish(StatusUpdate::Target(t));
    }

    fn persist(&mut self) {
        let rec = PersistedRecord {
            current: self.current,
            target: self.target,
        };
        if self.persisted == Some(rec) {
            return;
        }
        match self.persistence.save(rec) {
            Ok(()) => self.persisted = Some(rec),
            Err(e) => error!(error = %e, "failed to persist door state"),
        }
    }

    pub fn current(&self) -> DoorState {
        self.current
    }

    pub fn target(&self) -> TargetState {
        self.target
    }

    pub fn obstruction(&self) -> bool {
        self.obstruction
    }

    pub fn status(&self) -> DoorStatus {
        DoorStatus {
            current: self.current,
            target: self.target,
            obstruction: self.obstruction,
        }
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn is_idle(&self) -> bool {
        self.timers.is_idle()
    }

    /// Wait until the earliest armed timer, `None` when nothing is armed.
    pub fn time_to_next_timer(&self) -> Option<Duration> {
        self.timers
            .next_deadline()
            .map(|d| self.clock.until(d))
    }

    pub fn config(&self) -> &DoorCfg {
        &self.cfg
    }

    pub fn gpio(&self) -> &G {
        self.pulse.gpio()
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        self.pulse.gpio_mut()
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }
}
