//! Typed identifier newtypes.
//!
//! Zones and sensors are keyed by short human-chosen slugs taken from the
//! static configuration (`main_floor`, `buffer_tank`, …), so the ids wrap a
//! validated `String` rather than a generated UUID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Build an identifier, rejecting empty or whitespace-bearing slugs.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::InvalidId`] when `value` is empty or
            /// contains whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.is_empty() || value.chars().any(char::is_whitespace) {
                    return Err(ValidationError::InvalidId(value));
                }
                Ok(Self(value))
            }

            /// Borrow the inner slug.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Zone`](crate::zone::Zone).
    ZoneId
);

define_id!(
    /// Unique identifier for a temperature sensor.
    SensorId
);

/// Sensor id reserved for the buffer tank probe.
pub const BUFFER_TANK_SENSOR: &str = "buffer_tank";

impl SensorId {
    /// The buffer tank sensor, whose loss shuts the whole plant down.
    #[must_use]
    pub fn buffer_tank() -> Self {
        Self(BUFFER_TANK_SENSOR.to_string())
    }

    /// Whether this is the buffer tank sensor.
    #[must_use]
    pub fn is_buffer_tank(&self) -> bool {
        self.0 == BUFFER_TANK_SENSOR
    }
}
