use std::collections::HashMap;

use garage_traits::{BoxError, EdgeWatch, Gpio, LevelCallback};
use rppal::gpio::{InputPin, Level, OutputPin, Trigger};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

fn level(high: bool) -> Level {
    if high { Level::High } else { Level::Low }
}

/// Raspberry Pi GPIO via rppal. Pins stay owned here for the process lifetime
/// so output levels and input interrupts survive between calls.
pub struct RpiGpio {
    gpio: rppal::gpio::Gpio,
    outputs: HashMap<u8, OutputPin>,
    inputs: HashMap<u8, InputPin>,
}

impl RpiGpio {
    pub fn new() -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        Ok(Self {
            gpio,
            outputs: HashMap::new(),
            inputs: HashMap::new(),
        })
    }
}

impl Gpio for RpiGpio {
    fn setup_output(&mut self, pin: u8, initial_high: bool) -> std::result::Result<(), BoxError> {
        if self.inputs.contains_key(&pin) {
            return Err(Box::new(HwError::WrongDirection {
                pin,
                wanted: "output",
                actual: "input",
            }));
        }
        if let Some(out) = self.outputs.get_mut(&pin) {
            out.write(level(initial_high));
            return Ok(());
        }
        let mut out = self
            .gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open output pin {pin}: {e}")))?
            .into_output();
        // The relay must not flip when the process exits mid-pulse
        out.set_reset_on_drop(false);
        out.write(level(initial_high));
        debug!(pin, initial_high, "output pin configured");
        self.outputs.insert(pin, out);
        Ok(())
    }

    fn setup_input(&mut self, pin: u8) -> std::result::Result<(), BoxError> {
        if self.outputs.contains_key(&pin) {
            return Err(Box::new(HwError::WrongDirection {
                pin,
                wanted: "input",
                actual: "output",
            }));
        }
        if self.inputs.contains_key(&pin) {
            return Ok(());
        }
        let input = self
            .gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open input pin {pin}: {e}")))?
            .into_input();
        debug!(pin, "input pin configured");
        self.inputs.insert(pin, input);
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> std::result::Result<(), BoxError> {
        let out = self
            .outputs
            .get_mut(&pin)
            .ok_or(HwError::Unconfigured(pin))?;
        out.write(level(high));
        trace!(pin, high, "gpio write");
        Ok(())
    }

    fn read(&mut self, pin: u8) -> std::result::Result<bool, BoxError> {
        if let Some(input) = self.inputs.get(&pin) {
            return Ok(input.read() == Level::High);
        }
        if let Some(out) = self.outputs.get(&pin) {
            return Ok(out.is_set_high());
        }
        Err(Box::new(HwError::Unconfigured(pin)))
    }
}

impl EdgeWatch for RpiGpio {
    fn watch_input(&mut self, pin: u8, mut on_change: LevelCallback) -> std::result::Result<(), BoxError> {
        let input = self
            .inputs
            .get_mut(&pin)
            .ok_or(HwError::Unconfigured(pin))?;
        input
            .set_async_interrupt(Trigger::Both, move |lvl: Level| {
                on_change(pin, lvl == Level::High)
            })
            .map_err(|e| HwError::Gpio(format!("interrupt on pin {pin}: {e}")))?;
        debug!(pin, "input edge watch armed");
        Ok(())
    }
}
