#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the garage door controller.
//!
//! - `Config` and its sections are deserialized from TOML.
//! - `Config::validate` rejects anything the controller cannot run with;
//!   callers must treat a validation error as fatal before touching pins.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// Pulsed output driving the opener (BCM numbering)
    pub open: u8,
    /// Legacy separate close output. Only accepted when equal to `open`:
    /// the opener is a single toggle relay.
    pub close: Option<u8>,
    /// Door position input, required when `[input].enabled`
    pub state: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    /// Width of one button press in milliseconds
    pub emit_ms: u64,
    /// Relay is active-low
    pub reverse: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            emit_ms: 500,
            reverse: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Full travel time of the door in seconds
    pub execution_s: u64,
    /// Seconds until an opening door is reported open; defaults to `execution_s`
    pub opening_delay_s: Option<u64>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            execution_s: 15,
            opening_delay_s: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Control {
    /// Accept commands while the door is believed to be moving.
    /// A pulse mid-travel reverses a single-relay opener.
    pub allow_command_override: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Input {
    pub enabled: bool,
    /// Treat a low level as "open"
    pub reverse: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutoClose {
    pub enabled: bool,
    pub delay_s: u64,
    /// Hold-open window for openers with their own shorter auto-close.
    /// Only active when greater than `delay_s`; 0 disables.
    pub virtual_opening_delay_s: u64,
}

impl Default for AutoClose {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_s: 15,
            virtual_opening_delay_s: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    pub path: String,
    /// JSONPath selecting the "door is open" value in the request body
    pub json_path: String,
    pub value_reverse: bool,
}

impl Default for Webhook {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0".to_string(),
            port: 8080,
            path: "/garage".to_string(),
            json_path: "$.open".to_string(),
            value_reverse: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Directory holding the persisted door state
    pub dir: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            dir: "/var/lib/garage-door".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    pub pins: Pins,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub control: Control,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub auto_close: AutoClose,
    #[serde(default)]
    pub webhook: Webhook,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub logging: Logging,
}

fn default_name() -> String {
    "Garage Door".to_string()
}

/// Upper bound for every delay in the config, one day.
pub const MAX_DELAY_S: u64 = 86_400;

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_path(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if let Some(close) = self.pins.close
            && close != self.pins.open
        {
            eyre::bail!(
                "pins.close ({close}) must equal pins.open ({}): open and close share one relay",
                self.pins.open
            );
        }
        if self.input.enabled {
            match self.pins.state {
                None => eyre::bail!("pins.state is missing but input.enabled = true"),
                Some(state) if state == self.pins.open => {
                    eyre::bail!("pins.state must differ from pins.open")
                }
                Some(_) => {}
            }
        }

        // Output
        if self.output.emit_ms == 0 {
            eyre::bail!("output.emit_ms must be >= 1");
        }
        if self.output.emit_ms > 10_000 {
            eyre::bail!("output.emit_ms is unreasonably large (>10s)");
        }

        // Timing
        if self.timing.execution_s == 0 {
            eyre::bail!("timing.execution_s must be >= 1");
        }
        if self.timing.execution_s > MAX_DELAY_S {
            eyre::bail!("timing.execution_s is unreasonably large (>{MAX_DELAY_S}s)");
        }
        match self.timing.opening_delay_s {
            Some(0) => eyre::bail!("timing.opening_delay_s must be >= 1 when set"),
            Some(d) if d > MAX_DELAY_S => {
                eyre::bail!("timing.opening_delay_s is unreasonably large (>{MAX_DELAY_S}s)")
            }
            _ => {}
        }

        // Auto-close
        if self.auto_close.enabled {
            if self.auto_close.delay_s == 0 {
                eyre::bail!("auto_close.delay_s must be >= 1");
            }
            if self.auto_close.delay_s > MAX_DELAY_S {
                eyre::bail!("auto_close.delay_s is unreasonably large (>{MAX_DELAY_S}s)");
            }
            if self.auto_close.virtual_opening_delay_s > MAX_DELAY_S {
                eyre::bail!(
                    "auto_close.virtual_opening_delay_s is unreasonably large (>{MAX_DELAY_S}s)"
                );
            }
        }

        // Webhook
        if self.webhook.enabled {
            if self.webhook.port == 0 {
                eyre::bail!("webhook.port must be >= 1");
            }
            if !self.webhook.path.starts_with('/') {
                eyre::bail!("webhook.path must start with '/'");
            }
            if let Err(e) = serde_json_path::JsonPath::parse(&self.webhook.json_path) {
                eyre::bail!("webhook.json_path is not a valid JSONPath: {e}");
            }
        }

        // Storage
        if self.storage.dir.trim().is_empty() {
            eyre::bail!("storage.dir must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }

    /// Opening travel time, falling back to the full travel time.
    pub fn opening_delay_s(&self) -> u64 {
        self.timing
            .opening_delay_s
            .unwrap_or(self.timing.execution_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = load_toml("[pins]\nopen = 17\n").expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.name, "Garage Door");
        assert_eq!(cfg.output.emit_ms, 500);
        assert_eq!(cfg.timing.execution_s, 15);
        assert_eq!(cfg.opening_delay_s(), 15);
        assert_eq!(cfg.auto_close.delay_s, 15);
        assert!(!cfg.control.allow_command_override);
        assert!(!cfg.webhook.enabled);
    }

    #[test]
    fn opening_delay_overrides_travel_time() {
        let cfg = load_toml("[pins]\nopen = 17\n[timing]\nexecution_s = 20\nopening_delay_s = 8\n")
            .expect("parse");
        assert_eq!(cfg.opening_delay_s(), 8);
    }
}
