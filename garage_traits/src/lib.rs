pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the hardware and storage seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pin-addressed GPIO primitive. Pins are BCM numbers.
///
/// Every call on a pin that was never set up must fail; callers rely on that
/// to surface wiring mistakes instead of silently writing nowhere.
pub trait Gpio {
    fn setup_output(&mut self, pin: u8, initial_high: bool) -> Result<(), BoxError>;
    fn setup_input(&mut self, pin: u8) -> Result<(), BoxError>;
    fn write(&mut self, pin: u8, high: bool) -> Result<(), BoxError>;
    fn read(&mut self, pin: u8) -> Result<bool, BoxError>;
}

impl<G: Gpio + ?Sized> Gpio for Box<G> {
    fn setup_output(&mut self, pin: u8, initial_high: bool) -> Result<(), BoxError> {
        (**self).setup_output(pin, initial_high)
    }
    fn setup_input(&mut self, pin: u8) -> Result<(), BoxError> {
        (**self).setup_input(pin)
    }
    fn write(&mut self, pin: u8, high: bool) -> Result<(), BoxError> {
        (**self).write(pin, high)
    }
    fn read(&mut self, pin: u8) -> Result<bool, BoxError> {
        (**self).read(pin)
    }
}

/// Callback invoked with the new level of a watched input line.
pub type LevelCallback = Box<dyn FnMut(u8, bool) + Send + 'static>;

/// Edge notification for input lines. The callback runs on whatever thread
/// the backend delivers interrupts on, so it must only hand the event off.
pub trait EdgeWatch {
    fn watch_input(&mut self, pin: u8, on_change: LevelCallback) -> Result<(), BoxError>;
}

/// Durable string-keyed store. Both calls are synchronous; `set` returns only
/// once the value would survive a process restart.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError>;
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        (**self).get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError> {
        (**self).set(key, value)
    }
}
