//! Event loop owning the controller.
//!
//! Adapters and the host never touch the controller directly. They hold a
//! `DoorHandle` and send `Event`s; the loop thread applies them one at a
//! time and fires timers between events. Timers that are due are fired
//! before the next event is dispatched.

use std::time::Duration;

use crossbeam_channel as xch;
use garage_traits::{EdgeWatch, Gpio, LevelCallback, StateStore};

use crate::controller::DoorController;
use crate::error::GarageError;
use crate::hw_error::map_hw_error;
use crate::state::{DoorStatus, TargetState};

#[derive(Debug)]
pub enum Event {
    SetTarget(TargetState),
    InputLevel { pin: u8, high: bool },
    External(TargetState),
    Query(xch::Sender<DoorStatus>),
    Shutdown,
}

/// Cloneable sender side of the loop. Every method fails with
/// `GarageError::Stopped` once the runtime is gone.
#[derive(Debug, Clone)]
pub struct DoorHandle {
    tx: xch::Sender<Event>,
}

impl DoorHandle {
    fn send(&self, ev: Event) -> Result<(), GarageError> {
        self.tx.send(ev).map_err(|_| GarageError::Stopped)
    }

    pub fn set_target(&self, target: TargetState) -> Result<(), GarageError> {
        self.send(Event::SetTarget(target))
    }

    pub fn report_external(&self, observed: TargetState) -> Result<(), GarageError> {
        self.send(Event::External(observed))
    }

    pub fn input_level(&self, pin: u8, high: bool) -> Result<(), GarageError> {
        self.send(Event::InputLevel { pin, high })
    }

    pub fn shutdown(&self) -> Result<(), GarageError> {
        self.send(Event::Shutdown)
    }

    /// Snapshot from the loop thread. Must not be called from the loop
    /// thread itself.
    pub fn status(&self, timeout: Duration) -> Result<DoorStatus, GarageError> {
        let (tx, rx) = xch::bounded(1);
        self.send(Event::Query(tx))?;
        rx.recv_timeout(timeout).map_err(|_| GarageError::Stopped)
    }

    /// Edge callback for an input watcher, forwarding into the loop.
    pub fn level_callback(&self) -> LevelCallback {
        let handle = self.clone();
        Box::new(move |pin, high| {
            if handle.input_level(pin, high).is_err() {
                tracing::debug!(pin, "input edge dropped, runtime stopped");
            }
        })
    }
}

pub struct Runtime<G: Gpio, S: StateStore> {
    controller: DoorController<G, S>,
    tx: xch::Sender<Event>,
    rx: xch::Receiver<Event>,
}

impl<G: Gpio, S: StateStore> Runtime<G, S> {
    pub fn new(controller: DoorController<G, S>) -> Self {
        let (tx, rx) = xch::unbounded();
        Self { controller, tx, rx }
    }

    pub fn handle(&self) -> DoorHandle {
        DoorHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn controller(&self) -> &DoorController<G, S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DoorController<G, S> {
        &mut self.controller
    }

    pub fn into_controller(self) -> DoorController<G, S> {
        self.controller
    }

    /// Returns false on `Shutdown`.
    fn dispatch(&mut self, ev: Event) -> bool {
        self.controller.fire_due();
        match ev {
            Event::SetTarget(t) => {
                let outcome = self.controller.set_target(t);
                tracing::debug!(?outcome, "command processed");
            }
            Event::InputLevel { pin, high } => self.controller.input_level(pin, high),
            Event::External(t) => self.controller.report_external(t),
            Event::Query(reply) => {
                let _ = reply.send(self.controller.status());
            }
            Event::Shutdown => {
                tracing::info!("door runtime shutting down");
                return false;
            }
        }
        true
    }

    /// Apply everything already queued without blocking. False when a
    /// `Shutdown` was among them.
    pub fn process_pending(&mut self) -> bool {
        while let Ok(ev) = self.rx.try_recv() {
            if !self.dispatch(ev) {
                return false;
            }
        }
        self.controller.fire_due();
        true
    }

    /// Block until one event arrives or the next timer is due, and handle
    /// it. False on shutdown.
    pub fn step(&mut self) -> bool {
        self.controller.fire_due();
        let received = match self.controller.time_to_next_timer() {
            Some(wait) => match self.rx.recv_timeout(wait) {
                Ok(ev) => Some(ev),
                Err(xch::RecvTimeoutError::Timeout) => None,
                Err(xch::RecvTimeoutError::Disconnected) => return false,
            },
            None => match self.rx.recv() {
                Ok(ev) => Some(ev),
                Err(_) => return false,
            },
        };
        match received {
            Some(ev) => self.dispatch(ev),
            None => {
                self.controller.fire_due();
                true
            }
        }
    }

    /// Serve until `Shutdown`.
    pub fn run(&mut self) {
        tracing::info!("door runtime running");
        while self.step() {}
    }

    /// Serve until no timer is armed and the queue is empty, or until
    /// `Shutdown`. Returns the settled status.
    pub fn run_until_idle(&mut self) -> DoorStatus {
        loop {
            if !self.process_pending() {
                break;
            }
            let Some(wait) = self.controller.time_to_next_timer() else {
                break;
            };
            match self.rx.recv_timeout(wait) {
                Ok(ev) => {
                    if !self.dispatch(ev) {
                        break;
                    }
                }
                Err(_) => {
                    self.controller.fire_due();
                }
            }
        }
        self.controller.status()
    }
}

impl<G: Gpio + EdgeWatch, S: StateStore> Runtime<G, S> {
    /// Route input-pin edges into this loop. No-op without input tracking.
    pub fn watch_input(&mut self) -> Result<(), GarageError> {
        let Some(input) = self.controller.config().input else {
            return Ok(());
        };
        let cb = self.handle().level_callback();
        self.controller
            .gpio_mut()
            .watch_input(input.pin, cb)
            .map_err(|e| map_hw_error(&*e))?;
        tracing::debug!(pin = input.pin, "watching door input");
        Ok(())
    }
}
