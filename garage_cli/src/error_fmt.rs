//! Human-readable error descriptions and structured JSON error formatting.

use garage_core::GarageError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ge) = err.downcast_ref::<GarageError>() {
        return match ge {
            GarageError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML, or a close pin different from the open pin.\nHow to fix: Edit the config file, then rerun. See etc/garage.toml for a sample."
            ),
            GarageError::UnconfiguredPin(pin) => format!(
                "What happened: GPIO pin {pin} was used before it was set up.\nLikely causes: The pin number in [pins] does not match the wiring, or input.enabled is off while a sensor is expected.\nHow to fix: Check the [pins] section against the relay and sensor wiring."
            ),
            GarageError::Hardware(msg) => format!(
                "What happened: GPIO access failed ({msg}).\nLikely causes: Insufficient permissions on /dev/gpiomem, a pin already claimed by another process, or a non-Raspberry Pi host.\nHow to fix: Run as a user in the gpio group and make sure no other service owns the pins."
            ),
            GarageError::Persistence(msg) => format!(
                "What happened: Door state could not be stored ({msg}).\nLikely causes: storage.dir is missing or not writable.\nHow to fix: Create the directory or point storage.dir somewhere writable."
            ),
            GarageError::Stopped => "What happened: The controller stopped before the command finished.\nLikely causes: Shutdown requested (Ctrl-C) while the door was moving.\nHow to fix: Check the door and rerun the command if needed.".to_string(),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, hardware 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<GarageError>() {
        Some(GarageError::Config(_)) => 2,
        Some(GarageError::Hardware(_) | GarageError::UnconfiguredPin(_)) => 3,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<GarageError>() {
        Some(GarageError::Config(_)) => "Config",
        Some(GarageError::Hardware(_) | GarageError::UnconfiguredPin(_)) => "Hardware",
        Some(GarageError::Persistence(_)) => "Persistence",
        Some(GarageError::Stopped) => "Stopped",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let cfg: eyre::Report = GarageError::Config("x".into()).into();
        let hw: eyre::Report = GarageError::UnconfiguredPin(4).into();
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&cfg), 2);
        assert_eq!(exit_code_for_error(&hw), 3);
        assert_eq!(exit_code_for_error(&other), 1);
    }

    #[test]
    fn context_does_not_hide_the_typed_error() {
        use eyre::WrapErr;
        let r: Result<(), GarageError> = Err(GarageError::Hardware("bus".into()));
        let err = r.wrap_err("start door controller").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("GPIO access failed (bus)"));
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let err: eyre::Report = GarageError::Persistence("ro fs".into()).into();
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Persistence");
        assert!(v["message"].as_str().unwrap().contains("ro fs"));
    }
}
