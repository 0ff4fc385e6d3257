//! Logical GPIO pins with polarity.

use serde::{Deserialize, Serialize};

/// A relay-driving GPIO pin.
///
/// Relay boards are commonly active-low, so "active" (energised) is a
/// function of both the electrical level and the pin's polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpioPin {
    pub number: u8,
    pub active_high: bool,
}

impl GpioPin {
    #[must_use]
    pub fn new(number: u8, active_high: bool) -> Self {
        Self {
            number,
            active_high,
        }
    }

    /// Whether the given electrical level means "energised" for this pin.
    #[must_use]
    pub fn is_active_level(self, level: bool) -> bool {
        level == self.active_high
    }

    /// The electrical level that energises (or de-energises) this pin.
    #[must_use]
    pub fn level_for(self, active: bool) -> bool {
        active == self.active_high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_high_level_as_active_for_active_high_pin() {
        let pin = GpioPin::new(17, true);
        assert!(pin.is_active_level(true));
        assert!(!pin.is_active_level(false));
        assert!(pin.level_for(true));
    }

    #[test]
    fn should_treat_low_level_as_active_for_active_low_pin() {
        let pin = GpioPin::new(17, false);
        assert!(pin.is_active_level(false));
        assert!(!pin.is_active_level(true));
        assert!(!pin.level_for(true));
        assert!(pin.level_for(false));
    }
}
