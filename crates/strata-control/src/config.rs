// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-kernel cadence configuration.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence settings for one kernel.
///
/// Every field has a default, so a partial TOML table is enough:
///
/// ```toml
/// fixed_update_hz = 30
/// frame_rate_cap = 144
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Fixed-update ticks per second.
    pub fixed_update_hz: u32,
    /// Upper bound on fixed ticks run in a single frame. Excess accumulated time
    /// is discarded so a stalled frame cannot snowball.
    pub max_fixed_steps_per_frame: u32,
    /// Variable-cadence frames per second. `None` runs as fast as possible,
    /// yielding the thread once per frame.
    pub frame_rate_cap: Option<u32>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            fixed_update_hz: 60,
            max_fixed_steps_per_frame: 5,
            frame_rate_cap: None,
        }
    }
}

impl KernelConfig {
    /// Checks that every rate is positive.
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.fixed_update_hz == 0 {
            return Err(KernelError::InvalidConfig("fixed_update_hz must be > 0"));
        }
        if self.max_fixed_steps_per_frame == 0 {
            return Err(KernelError::InvalidConfig(
                "max_fixed_steps_per_frame must be > 0",
            ));
        }
        if self.frame_rate_cap == Some(0) {
            return Err(KernelError::InvalidConfig("frame_rate_cap must be > 0"));
        }
        Ok(())
    }

    /// Length of one fixed tick.
    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fixed_update_hz.max(1)))
    }

    /// Minimum length of one frame, if capped.
    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_rate_cap
            .filter(|cap| *cap > 0)
            .map(|cap| Duration::from_secs_f64(1.0 / f64::from(cap)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_budget(), None);
        assert!((config.fixed_step().as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: KernelConfig = toml::from_str("frame_rate_cap = 100").unwrap();
        assert_eq!(config.fixed_update_hz, 60);
        assert_eq!(config.frame_budget(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_zero_rates_are_rejected() {
        let config = KernelConfig {
            fixed_update_hz: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(KernelError::InvalidConfig(_))
        ));

        let config = KernelConfig {
            frame_rate_cap: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
