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

//! Busy-wait helper used by blocking channel operations.

use crate::policy::WaitMode;

/// Number of pure spin iterations before a [`WaitMode::Hybrid`] wait yields.
const SPIN_LIMIT: u32 = 64;

/// Exponential spin with an optional fallback to `thread::yield_now`.
///
/// ```
/// use strata_data::{SpinWait, WaitMode};
///
/// let mut wait = SpinWait::new(WaitMode::Hybrid);
/// for _ in 0..100 {
///     wait.spin_once();
/// }
/// assert!(wait.has_yielded());
/// ```
#[derive(Debug, Clone)]
pub struct SpinWait {
    mode: WaitMode,
    count: u32,
}

impl SpinWait {
    /// Creates a fresh waiter.
    pub fn new(mode: WaitMode) -> Self {
        Self { mode, count: 0 }
    }

    /// Waits a little. The wait gets longer with each call, up to a bound.
    pub fn spin_once(&mut self) {
        self.count = self.count.saturating_add(1);
        if self.mode == WaitMode::Hybrid && self.count > SPIN_LIMIT {
            std::thread::yield_now();
            return;
        }
        for _ in 0..self.count.min(SPIN_LIMIT) {
            std::hint::spin_loop();
        }
    }

    /// Returns `true` once the waiter has started yielding.
    pub fn has_yielded(&self) -> bool {
        self.mode == WaitMode::Hybrid && self.count > SPIN_LIMIT
    }

    /// Starts over with short spins.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_mode_never_yields() {
        let mut wait = SpinWait::new(WaitMode::Spin);
        for _ in 0..(SPIN_LIMIT * 2) {
            wait.spin_once();
        }
        assert!(!wait.has_yielded());
    }

    #[test]
    fn test_reset() {
        let mut wait = SpinWait::new(WaitMode::Hybrid);
        for _ in 0..=SPIN_LIMIT {
            wait.spin_once();
        }
        assert!(wait.has_yielded());
        wait.reset();
        assert!(!wait.has_yielded());
    }
}
