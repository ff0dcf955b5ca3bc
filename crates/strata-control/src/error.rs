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

//! Errors raised while assembling or running a kernel.

use strata_core::{Affinity, ExitCode, ModuleError, Phase};

/// A failure that ends a kernel or prevents it from being built.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A module was registered with an empty or combined affinity.
    #[error("module `{module}` must name exactly one affinity, got {affinity}")]
    InvalidAffinity {
        /// Module type name.
        module: &'static str,
        /// The rejected affinity.
        affinity: Affinity,
    },
    /// The same module type was registered twice.
    #[error("module `{0}` is registered twice")]
    DuplicateModule(&'static str),
    /// A declared dependency is not registered on the same affinity.
    #[error("module `{module}` depends on `{dependency}`, which is not registered on this kernel")]
    MissingDependency {
        /// Module type name.
        module: &'static str,
        /// The missing dependency's type name.
        dependency: &'static str,
    },
    /// Dependencies form a cycle.
    #[error("dependency cycle between {}", .0.join(", "))]
    Cycle(Vec<&'static str>),
    /// A startup phase of a module failed.
    #[error("module `{module}` failed during {phase}")]
    Module {
        /// Module display name.
        module: String,
        /// The failing phase.
        phase: Phase,
        /// What the module reported.
        #[source]
        source: ModuleError,
    },
    /// A configuration value is out of range.
    #[error("invalid kernel configuration: {0}")]
    InvalidConfig(&'static str),
    /// The operating system refused to start the kernel thread.
    #[error("failed to spawn the {affinity} kernel thread")]
    Spawn {
        /// The kernel's affinity.
        affinity: Affinity,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The kernel thread panicked.
    #[error("the {affinity} kernel thread panicked: {message}")]
    Panicked {
        /// The kernel's affinity.
        affinity: Affinity,
        /// The panic payload, if it was a string.
        message: String,
        /// The exit code the kernel recorded before panicking.
        last_recorded: ExitCode,
    },
}

impl KernelError {
    /// The exit code this error maps to.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            KernelError::Module {
                source: ModuleError::Cancelled,
                ..
            } => ExitCode::Canceled,
            KernelError::Panicked { last_recorded, .. } => *last_recorded,
            _ => ExitCode::Fatal,
        }
    }
}
