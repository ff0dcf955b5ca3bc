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

//! Thread roles.
//!
//! An [`Affinity`] names the dedicated thread a kernel and its modules run on.
//! A session activates a subset of affinities depending on its launch role, and
//! at most one kernel exists per active affinity.

use crate::strata_bitflags;

strata_bitflags! {
    /// A set of thread roles.
    ///
    /// A single flag identifies one kernel thread; a combination describes the
    /// affinities active in a session.
    pub struct Affinity: u8 {
        /// Platform event pump and window ownership.
        const MAIN = 1 << 0;
        /// Simulation and game logic.
        const GAME = 1 << 1;
        /// Frame submission to the graphics backend.
        const RENDER = 1 << 2;
    }
}

impl Affinity {
    /// Every affinity the runtime knows about.
    pub const ALL: Self = Self::from_bits_truncate(0b111);

    /// Returns `true` if `self` names exactly one thread role.
    pub const fn is_single(&self) -> bool {
        self.bits() != 0 && self.bits() & (self.bits() - 1) == 0
    }

    /// A short lowercase name for a single affinity, used in thread names and logs.
    ///
    /// Combined or empty sets return `"mixed"` and `"none"`.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::MAIN => "main",
            Self::GAME => "game",
            Self::RENDER => "render",
            Self::EMPTY => "none",
            _ => "mixed",
        }
    }

    /// Dense index of a single affinity, used for per-affinity counters.
    pub fn index(&self) -> Option<usize> {
        self.is_single().then(|| self.bits().trailing_zeros() as usize)
    }

    /// Number of distinct single affinities.
    pub const COUNT: usize = 3;
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
