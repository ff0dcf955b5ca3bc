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

//! Kernel and process exit codes.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Terminal status of a kernel, ordered by severity.
///
/// The process exit code is the most severe status across all kernels, so the
/// derived `Ord` follows the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean shutdown.
    #[default]
    Ok = 0,
    /// A stop was requested before the kernel finished starting up.
    Canceled = 10,
    /// A non-fatal error ended the kernel gracefully.
    Recoverable = 20,
    /// An unrecoverable error.
    Fatal = 30,
}

impl ExitCode {
    /// The numeric code handed to the operating system.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw code back to a status. Unknown values are treated as fatal.
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            10 => Self::Canceled,
            20 => Self::Recoverable,
            _ => Self::Fatal,
        }
    }

    /// Reduces a set of kernel results to the single process result.
    ///
    /// An empty set is `Ok`.
    pub fn most_severe(codes: impl IntoIterator<Item = ExitCode>) -> ExitCode {
        codes.into_iter().max().unwrap_or_default()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// A shared, thread-safe slot holding the last exit code a kernel recorded.
///
/// The kernel thread writes it as its state changes; the orchestrator reads it
/// after joining, including when the join itself fails.
#[derive(Debug, Clone, Default)]
pub struct ExitCodeCell {
    code: Arc<AtomicI32>,
}

impl ExitCodeCell {
    /// Creates a cell initialised to [`ExitCode::Ok`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code`, replacing the previous value.
    pub fn record(&self, code: ExitCode) {
        self.code.store(code.code(), Ordering::Release);
    }

    /// Records `code` only if it is more severe than the current value.
    pub fn escalate(&self, code: ExitCode) {
        self.code.fetch_max(code.code(), Ordering::AcqRel);
    }

    /// Returns the last recorded code.
    pub fn get(&self) -> ExitCode {
        ExitCode::from_code(self.code.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_process_contract() {
        assert_eq!(ExitCode::Ok.code(), 0);
        assert_eq!(ExitCode::Canceled.code(), 10);
        assert_eq!(ExitCode::Recoverable.code(), 20);
        assert_eq!(ExitCode::Fatal.code(), 30);
    }

    #[test]
    fn test_most_severe_wins() {
        let codes = [ExitCode::Ok, ExitCode::Fatal, ExitCode::Recoverable];
        assert_eq!(ExitCode::most_severe(codes), ExitCode::Fatal);
        assert_eq!(ExitCode::most_severe([]), ExitCode::Ok);
        assert_eq!(
            ExitCode::most_severe([ExitCode::Ok, ExitCode::Ok, ExitCode::Ok]),
            ExitCode::Ok
        );
    }

    #[test]
    fn test_cell_escalate_never_lowers() {
        let cell = ExitCodeCell::new();
        cell.escalate(ExitCode::Recoverable);
        cell.escalate(ExitCode::Canceled);
        assert_eq!(cell.get(), ExitCode::Recoverable);
        cell.record(ExitCode::Ok);
        assert_eq!(cell.get(), ExitCode::Ok);
    }

    #[test]
    fn test_unknown_code_is_fatal() {
        assert_eq!(ExitCode::from_code(3), ExitCode::Fatal);
    }
}
