#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = garage_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A valid config must map to runtime config without panicking
        let door = garage_core::DoorCfg::from(&cfg);
        let _ = door.auto_close.map(|ac| ac.virtual_opening_active());
    }
});
