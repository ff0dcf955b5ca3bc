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

//! # Strata SDK
//!
//! The public entry point for building a Strata application: pick a [`Role`],
//! register modules and shared channels on an [`ApplicationBuilder`], then
//! [`run`](Application::run) the resulting [`Application`] to get the process
//! exit code.

#![warn(missing_docs)]

pub mod application;
pub mod config;
pub mod role;

pub use application::{Application, ApplicationBuilder};
pub use config::{ConfigError, RuntimeConfig};
pub use role::Role;

pub use strata_control as control;
pub use strata_core as core;
pub use strata_data as data;

/// The types most applications need.
pub mod prelude {
    pub use crate::{Application, ApplicationBuilder, Role, RuntimeConfig};
    pub use strata_control::KernelConfig;
    pub use strata_core::{
        Affinity, CancellationToken, Context, ExitCode, Flow, FrameTime, LogSinkExt, Module,
        ModuleDescriptor, ModuleError, ModuleResult,
    };
    pub use strata_data::{
        ring_channel, CapacityPolicy, DoubleBufferedQueue, DropMode, FullMode, RingChannel,
        RingOptions, RingReader, RingWriter, SnapshotChannel, SnapshotOptions,
        SnapshotPublisher, WaitMode,
    };
}
