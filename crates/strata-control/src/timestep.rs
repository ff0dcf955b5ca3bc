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

//! Fixed-timestep accumulator.

use std::time::Duration;

/// Accumulates frame time and hands out fixed-length ticks.
///
/// ```
/// use std::time::Duration;
/// use strata_control::FixedTimestep;
///
/// let mut timestep = FixedTimestep::new(Duration::from_millis(10), 4);
/// timestep.advance(Duration::from_millis(25));
/// assert!(timestep.consume_step());
/// assert!(timestep.consume_step());
/// assert!(!timestep.consume_step());
/// assert!((timestep.alpha() - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_backlog: Duration,
}

impl FixedTimestep {
    /// Creates an accumulator for ticks of length `step`, keeping at most
    /// `max_steps` ticks of backlog.
    pub fn new(step: Duration, max_steps: u32) -> Self {
        let step = step.max(Duration::from_nanos(1));
        Self {
            step,
            accumulator: Duration::ZERO,
            max_backlog: step * max_steps.max(1),
        }
    }

    /// Adds elapsed frame time. Backlog beyond the bound is dropped.
    pub fn advance(&mut self, delta: Duration) {
        self.accumulator += delta;
        if self.accumulator > self.max_backlog {
            log::trace!(
                "FixedTimestep: dropping {:?} of backlog",
                self.accumulator - self.max_backlog
            );
            self.accumulator = self.max_backlog;
        }
    }

    /// Takes one tick out of the accumulator if a full one is available.
    pub fn consume_step(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Fraction of a tick left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f64() / self.step.as_secs_f64()) as f32
    }

    /// Length of one tick.
    pub fn step(&self) -> Duration {
        self.step
    }
}
