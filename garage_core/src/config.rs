//! Runtime configuration used by `DoorController` and the adapters.
//!
//! Separate from the TOML schema in `garage_config`; see `conversions` for
//! the mapping.

use std::time::Duration;

/// Period of the hold-open pulse while a virtual opening window is active.
pub const VIRTUAL_PULSE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DoorCfg {
    /// Display name, used in log fields only.
    pub name: String,
    /// The single output driving the opener, for both directions.
    pub open_pin: u8,
    /// Width of one pulse.
    pub emit: Duration,
    /// Relay is active-low.
    pub reverse_output: bool,
    /// Full travel time; closing is reported done after this.
    pub travel: Duration,
    /// Time until an opening door is reported open.
    pub opening_delay: Duration,
    /// Accept commands while current != target.
    pub allow_command_override: bool,
    /// Hardware position input; `Some` enables input tracking.
    pub input: Option<InputCfg>,
    /// `Some` enables auto-close.
    pub auto_close: Option<AutoCloseCfg>,
}

impl Default for DoorCfg {
    fn default() -> Self {
        Self {
            name: "Garage Door".to_string(),
            open_pin: 17,
            emit: Duration::from_millis(500),
            reverse_output: false,
            travel: Duration::from_secs(15),
            opening_delay: Duration::from_secs(15),
            allow_command_override: false,
            input: None,
            auto_close: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCfg {
    pub pin: u8,
    /// Low level means open.
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCloseCfg {
    pub delay: Duration,
    /// Hold-open window; zero disables.
    pub virtual_opening: Duration,
}

impl AutoCloseCfg {
    /// The periodic hold-open pulse only runs when its window outlasts the
    /// auto-close delay.
    pub fn virtual_opening_active(&self) -> bool {
        !self.virtual_opening.is_zero() && self.virtual_opening > self.delay
    }
}

impl Default for AutoCloseCfg {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(15),
            virtual_opening: Duration::ZERO,
        }
    }
}

/// Webhook listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookCfg {
    pub bind: String,
    pub port: u16,
    pub path: String,
    pub json_path: String,
    pub value_reverse: bool,
}

impl Default for WebhookCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            path: "/garage".to_string(),
            json_path: "$.open".to_string(),
            value_reverse: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 20, true)]
    #[case(10, 5, false)]
    #[case(10, 10, false)]
    #[case(10, 0, false)]
    fn virtual_opening_threshold(#[case] delay: u64, #[case] window: u64, #[case] active: bool) {
        let ac = AutoCloseCfg {
            delay: Duration::from_secs(delay),
            virtual_opening: Duration::from_secs(window),
        };
        assert_eq!(ac.virtual_opening_active(), active);
    }
}
