//! Maps `Box<dyn Error>` from trait boundaries to typed `GarageError`.
//!
//! The traits in `garage_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our error enum, with an optional feature-gated
//! path for `garage_hardware::HwError` downcasting.

use crate::error::GarageError;

/// Map a GPIO trait-boundary error to a typed `GarageError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> GarageError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<garage_hardware::HwError>() {
            return match hw {
                garage_hardware::HwError::Unconfigured(pin) => GarageError::UnconfiguredPin(*pin),
                other => GarageError::Hardware(other.to_string()),
            };
        }
    }

    GarageError::Hardware(e.to_string())
}

/// Map a storage trait-boundary error.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> GarageError {
    GarageError::Persistence(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_errors_become_hardware() {
        let e = std::io::Error::other("bus fault");
        assert_eq!(
            map_hw_error(&e),
            GarageError::Hardware("bus fault".to_string())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn unconfigured_pin_is_typed() {
        let e = garage_hardware::HwError::Unconfigured(22);
        assert_eq!(map_hw_error(&e), GarageError::UnconfiguredPin(22));
    }
}
