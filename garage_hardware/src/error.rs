use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("gpio pin {0} is not configured")]
    Unconfigured(u8),
    #[error("gpio pin {pin} is configured as {actual}, not {wanted}")]
    WrongDirection {
        pin: u8,
        wanted: &'static str,
        actual: &'static str,
    },
    #[error("simulated write failure on pin {0}")]
    InjectedFault(u8),
}

pub type Result<T> = std::result::Result<T, HwError>;
