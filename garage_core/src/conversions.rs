//! `From` implementations bridging `garage_config` types to `garage_core` types.

use std::time::Duration;

use crate::config::{AutoCloseCfg, DoorCfg, InputCfg, WebhookCfg};

// ── DoorCfg ──────────────────────────────────────────────────────────────────

impl From<&garage_config::Config> for DoorCfg {
    fn from(c: &garage_config::Config) -> Self {
        let input = if c.input.enabled {
            c.pins.state.map(|pin| InputCfg {
                pin,
                reverse: c.input.reverse,
            })
        } else {
            None
        };
        let auto_close = c.auto_close.enabled.then(|| AutoCloseCfg::from(&c.auto_close));
        Self {
            name: c.name.clone(),
            open_pin: c.pins.open,
            emit: Duration::from_millis(c.output.emit_ms),
            reverse_output: c.output.reverse,
            travel: Duration::from_secs(c.timing.execution_s),
            opening_delay: Duration::from_secs(c.opening_delay_s()),
            allow_command_override: c.control.allow_command_override,
            input,
            auto_close,
        }
    }
}

// ── AutoCloseCfg ─────────────────────────────────────────────────────────────

impl From<&garage_config::AutoClose> for AutoCloseCfg {
    fn from(c: &garage_config::AutoClose) -> Self {
        Self {
            delay: Duration::from_secs(c.delay_s),
            virtual_opening: Duration::from_secs(c.virtual_opening_delay_s),
        }
    }
}

// ── WebhookCfg ───────────────────────────────────────────────────────────────

impl From<&garage_config::Webhook> for WebhookCfg {
    fn from(c: &garage_config::Webhook) -> Self {
        Self {
            bind: c.bind.clone(),
            port: c.port,
            path: c.path.clone(),
            json_path: c.json_path.clone(),
            value_reverse: c.value_reverse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_full_config() {
        let cfg = garage_config::load_toml(
            r#"
[pins]
open = 4
state = 5
[output]
emit_ms = 250
reverse = true
[timing]
execution_s = 20
[input]
enabled = true
reverse = true
[auto_close]
enabled = true
delay_s = 10
virtual_opening_delay_s = 40
"#,
        )
        .unwrap();
        let door = DoorCfg::from(&cfg);
        assert_eq!(door.open_pin, 4);
        assert_eq!(door.emit, Duration::from_millis(250));
        assert!(door.reverse_output);
        assert_eq!(door.opening_delay, Duration::from_secs(20));
        assert_eq!(door.input, Some(InputCfg { pin: 5, reverse: true }));
        let ac = door.auto_close.expect("auto-close enabled");
        assert!(ac.virtual_opening_active());
    }

    #[test]
    fn disabled_sections_map_to_none() {
        let cfg = garage_config::load_toml("[pins]\nopen = 4\nstate = 5\n").unwrap();
        let door = DoorCfg::from(&cfg);
        assert!(door.input.is_none());
        assert!(door.auto_close.is_none());
    }
}
