//! Status publishing toward the host and command outcomes.

use crate::state::{DoorState, TargetState};

/// A characteristic value pushed outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Current(DoorState),
    Target(TargetState),
    Obstruction(bool),
}

/// Host collaborator receiving every published change.
pub trait StatusSink: Send {
    fn publish(&self, update: StatusUpdate);
}

/// Default sink: each update becomes a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn publish(&self, update: StatusUpdate) {
        match update {
            StatusUpdate::Current(s) => tracing::info!(state = %s, "current door state"),
            StatusUpdate::Target(t) => tracing::info!(target = %t, "target door state"),
            StatusUpdate::Obstruction(o) => tracing::debug!(obstruction = o, "obstruction"),
        }
    }
}

impl<T: StatusSink + Sync + ?Sized> StatusSink for std::sync::Arc<T> {
    fn publish(&self, update: StatusUpdate) {
        (**self).publish(update);
    }
}

/// What `set_target` did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed and the relay was pulsed.
    Accepted,
    /// Door is moving and overrides are disabled.
    RejectedMoving,
    /// Input tracking says the door is already there.
    AlreadyThere,
    /// Already open: auto-close countdown restarted instead of pulsing.
    KeepOpen,
}
