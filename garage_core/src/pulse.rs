//! Pulse driver: one "button press" on an output line.

use std::sync::Arc;
use std::time::Duration;

use garage_traits::{Clock, Gpio};
use tracing::{debug, trace};

use crate::error::GarageError;
use crate::hw_error::map_hw_error;
use crate::signal::drive_level;

pub struct PulseDriver<G: Gpio> {
    gpio: G,
    reverse_output: bool,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<G: Gpio> PulseDriver<G> {
    pub fn new(gpio: G, reverse_output: bool, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            gpio,
            reverse_output,
            clock,
        }
    }

    /// Configure `pin` as an output parked at its inactive level.
    pub fn init_output(&mut self, pin: u8) -> Result<(), GarageError> {
        let idle = drive_level(false, self.reverse_output);
        self.gpio
            .setup_output(pin, idle)
            .map_err(|e| map_hw_error(&*e))?;
        debug!(pin, idle, "output initialized");
        Ok(())
    }

    pub fn init_input(&mut self, pin: u8) -> Result<(), GarageError> {
        self.gpio
            .setup_input(pin)
            .map_err(|e| map_hw_error(&*e))
    }

    pub fn set_level(&mut self, pin: u8, high: bool) -> Result<(), GarageError> {
        trace!(pin, high, "set level");
        self.gpio
            .write(pin, high)
            .map_err(|e| map_hw_error(&*e))
    }

    pub fn read_level(&mut self, pin: u8) -> Result<bool, GarageError> {
        self.gpio.read(pin).map_err(|e| map_hw_error(&*e))
    }

    /// Drive `pin` active for `width`, then back to idle. No retry: a failed
    /// press is reported once and left to the caller.
    pub fn emit_pulse(&mut self, pin: u8, width: Duration) -> Result<(), GarageError> {
        debug!(pin, width_ms = width.as_millis() as u64, "pulse");
        self.set_level(pin, drive_level(true, self.reverse_output))?;
        self.clock.sleep(width);
        self.set_level(pin, drive_level(false, self.reverse_output))
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_hardware::{PinWrite, SimulatedGpio};
    use garage_traits::ManualClock;

    fn driver(reverse: bool) -> (PulseDriver<SimulatedGpio>, SimulatedGpio, ManualClock) {
        let gpio = SimulatedGpio::new();
        let clock = ManualClock::new();
        let d = PulseDriver::new(gpio.clone(), reverse, Arc::new(clock.clone()));
        (d, gpio, clock)
    }

    #[test]
    fn pulse_is_high_then_low_for_width() {
        let (mut d, gpio, clock) = driver(false);
        d.init_output(17).unwrap();
        assert_eq!(gpio.output_level(17), Some(false));

        d.emit_pulse(17, Duration::from_millis(400)).unwrap();
        assert_eq!(
            gpio.writes(),
            vec![
                PinWrite { pin: 17, high: true },
                PinWrite { pin: 17, high: false }
            ]
        );
        assert_eq!(clock.elapsed(), Duration::from_millis(400));
    }

    #[test]
    fn active_low_pulse_inverts_levels() {
        let (mut d, gpio, _clock) = driver(true);
        d.init_output(17).unwrap();
        assert_eq!(gpio.output_level(17), Some(true));
        d.emit_pulse(17, Duration::ZERO).unwrap();
        assert_eq!(gpio.pulses_on(17, false), 1);
        assert_eq!(gpio.output_level(17), Some(true));
    }

    #[test]
    fn unconfigured_pin_fails_with_typed_error() {
        let (mut d, _gpio, _clock) = driver(false);
        assert_eq!(
            d.emit_pulse(9, Duration::ZERO),
            Err(GarageError::UnconfiguredPin(9))
        );
        assert_eq!(d.read_level(9), Err(GarageError::UnconfiguredPin(9)));
    }
}
