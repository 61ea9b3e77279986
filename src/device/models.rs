use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Device connection state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Error(String),
}

/// Device-specific conversion constants, read once at connect time and
/// immutable for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub multiplier: f32,
    pub offset: f32,
}

impl Calibration {
    /// Converts a raw voltage reading to micromoles, clamped at zero.
    pub fn micromoles(&self, volts: f32) -> f32 {
        let micromoles = (volts - self.offset) * self.multiplier * 1000.0;
        micromoles.max(0.0)
    }
}

/// How many samples the averaged voltage read takes and how long it pauses
/// between them. The default spreads 5 samples over one second; tests pass
/// `Duration::ZERO` to keep the timing contract checkable without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct AveragingConfig {
    pub samples: u32,
    pub interval: Duration,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            samples: 5,
            interval: Duration::from_millis(200),
        }
    }
}

/// A historical sample stored on the device. The sensor logs one entry per
/// minute, oldest first; the timestamp is reconstructed from a caller-supplied
/// reference time during retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEntry {
    pub index: u32,
    pub timestamp: NaiveDateTime,
    pub value: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micromole_conversion() {
        let calibration = Calibration {
            multiplier: 2.0,
            offset: 0.5,
        };
        assert_eq!(calibration.micromoles(1.5), 2000.0);
    }

    #[test]
    fn test_micromoles_clamp_to_zero() {
        let calibration = Calibration {
            multiplier: 2.0,
            offset: 0.5,
        };
        assert_eq!(calibration.micromoles(0.3), 0.0);
    }
}
