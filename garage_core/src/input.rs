//! Hardware input adapter: input pin level to an observed position.

use crate::config::InputCfg;
use crate::signal::position_from_signal;
use crate::state::TargetState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAdapter {
    pin: u8,
    reverse: bool,
}

impl InputAdapter {
    pub fn new(cfg: InputCfg) -> Self {
        Self {
            pin: cfg.pin,
            reverse: cfg.reverse,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// `None` for any pin other than the configured one.
    pub fn observe(&self, pin: u8, high: bool) -> Option<TargetState> {
        if pin != self.pin {
            tracing::trace!(pin, "ignoring level change on foreign pin");
            return None;
        }
        Some(position_from_signal(high, self.reverse))
    }
}
