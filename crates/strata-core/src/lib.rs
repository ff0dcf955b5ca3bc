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

//! # Strata Core
//!
//! Foundational crate containing the contracts every other runtime crate builds
//! on: thread affinities, exit codes, the cooperative cancellation signal, the
//! shared session [`Context`], and the [`Module`](module::Module) lifecycle.

#![warn(missing_docs)]

pub mod affinity;
pub mod cancel;
pub mod context;
pub mod exit_code;
pub mod graph;
pub mod logging;
pub mod module;
pub mod service_registry;
pub mod utils;

pub use affinity::Affinity;
pub use cancel::{Cancelled, CancellationToken};
pub use context::{Context, ContextBuilder};
pub use exit_code::{ExitCode, ExitCodeCell};
pub use logging::{FacadeSink, LogLevel, LogRecord, LogSink, LogSinkExt};
pub use module::{
    Flow, FrameTime, Module, ModuleDescriptor, ModuleError, ModuleId, ModuleResult, Phase,
    PhaseCell,
};
pub use service_registry::ServiceRegistry;
pub use utils::timer::Stopwatch;
