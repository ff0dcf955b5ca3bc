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

//! # Strata Control
//!
//! The scheduling layer. A [`Kernel`] owns one thread bound to one
//! [`Affinity`](strata_core::Affinity) and drives the modules registered for it
//! through their lifecycle. The [`ModuleRegistry`] is the explicit registration
//! table kernels are built from.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod kernel;
pub mod registry;
pub mod timestep;

pub use config::KernelConfig;
pub use error::KernelError;
pub use kernel::{Kernel, KernelHandle};
pub use registry::{resolve_load_order, ModuleRegistry};
pub use timestep::FixedTimestep;
