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

//! Application assembly and the orchestrator run loop.

use crate::config::{ConfigError, RuntimeConfig};
use crate::role::Role;
use std::sync::Arc;
use strata_control::{Kernel, KernelError, KernelHandle, ModuleRegistry};
use strata_core::{
    Affinity, CancellationToken, Context, ExitCode, LogSink, LogSinkExt, ModuleDescriptor,
    ServiceRegistry,
};

const TARGET: &str = "strata::app";

/// Kernels are launched in this order.
const LAUNCH_ORDER: [Affinity; 3] = [Affinity::MAIN, Affinity::GAME, Affinity::RENDER];

/// Kernels are joined in this order.
const JOIN_ORDER: [Affinity; 3] = [Affinity::RENDER, Affinity::GAME, Affinity::MAIN];

/// Collects everything an [`Application`] needs before any thread starts.
///
/// ```
/// use strata_sdk::prelude::*;
///
/// #[derive(Default)]
/// struct Simulation;
/// impl Module for Simulation {}
///
/// let app = Application::builder()
///     .role(Role::Server)
///     .register(ModuleDescriptor::new::<Simulation>(Affinity::GAME, Simulation::default))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// app.cancellation_token().cancel();
/// assert_eq!(app.run(), ExitCode::Canceled);
/// ```
#[derive(Default)]
pub struct ApplicationBuilder {
    role: Role,
    config: RuntimeConfig,
    registry: ModuleRegistry,
    services: ServiceRegistry,
    log_sink: Option<Arc<dyn LogSink>>,
    cancellation: Option<CancellationToken>,
}

impl ApplicationBuilder {
    /// Sets the launch role. Defaults to [`Role::Client`].
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the runtime configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a shared service, typically an `Arc` of a channel.
    #[must_use]
    pub fn service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    /// Replaces the default log sink.
    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Shares an existing cancellation token with the session.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Adds a module to the registration table.
    ///
    /// # Errors
    ///
    /// See [`ModuleRegistry::register`].
    pub fn register(mut self, descriptor: ModuleDescriptor) -> Result<Self, KernelError> {
        self.registry.register(descriptor)?;
        Ok(self)
    }

    /// Validates the configuration and assembles the shared context.
    ///
    /// Modules registered on affinities the role does not activate are dropped
    /// with a warning. The role is registered as a service.
    pub fn build(self) -> Result<Application, ConfigError> {
        self.config.validate()?;

        let active = self.role.affinities();
        let mut registry = self.registry;
        let inactive = registry.affinities() & Affinity::from_bits_truncate(!active.bits());
        for affinity in inactive.iter() {
            for descriptor in registry.take(affinity) {
                log::warn!(
                    "Role {} has no {} kernel, skipping module {}.",
                    self.role,
                    affinity,
                    descriptor.id()
                );
            }
        }

        let mut services = self.services;
        services.insert(self.role);

        let mut context = Context::builder()
            .services(services)
            .cancellation(self.cancellation.unwrap_or_default())
            .active_affinities(active);
        if let Some(sink) = self.log_sink {
            context = context.log_sink(sink);
        }

        Ok(Application {
            role: self.role,
            config: self.config,
            registry,
            context: Arc::new(context.build()),
        })
    }
}

/// An assembled session, ready to launch its kernels.
pub struct Application {
    role: Role,
    config: RuntimeConfig,
    registry: ModuleRegistry,
    context: Arc<Context>,
}

impl Application {
    /// Starts building an application.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// The launch role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The shared session context.
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// A handle that stops every kernel when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.context.cancellation().clone()
    }

    /// Launches one kernel per active affinity, waits for all of them, and
    /// returns the most severe exit code.
    ///
    /// Kernels run independently: a kernel that fails does not stop the others.
    /// Use the cancellation token to stop the session.
    pub fn run(self) -> ExitCode {
        let Application {
            role,
            config,
            mut registry,
            context,
        } = self;
        let sink = context.log_sink();
        let active = role.affinities();

        sink.info(
            TARGET,
            &format!("Starting {role} session with {} modules.", registry.len()),
        );

        let mut handles: Vec<KernelHandle> = Vec::new();
        let mut codes: Vec<ExitCode> = Vec::new();

        for affinity in LAUNCH_ORDER {
            if !active.contains(affinity) {
                continue;
            }
            let kernel = Kernel::new(
                affinity,
                registry.take(affinity),
                config.kernel_config(affinity),
                Arc::clone(&context),
            );
            match kernel.spawn() {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    sink.fatal(TARGET, "Kernel failed to launch", &error);
                    codes.push(ExitCode::Fatal);
                }
            }
        }

        for affinity in JOIN_ORDER {
            let Some(position) = handles.iter().position(|h| h.affinity() == affinity) else {
                continue;
            };
            let handle = handles.swap_remove(position);
            match handle.join() {
                Ok(code) => {
                    log::debug!("Joined {affinity} kernel: {code}.");
                    codes.push(code);
                }
                Err(error) => {
                    sink.error(TARGET, "Kernel thread failed", &error);
                    codes.push(error.exit_code());
                }
            }
        }

        let code = ExitCode::most_severe(codes);
        sink.info(
            TARGET,
            &format!(
                "Session ended with {code} after {:.2}s.",
                context.uptime().as_secs_f64()
            ),
        );
        code
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("role", &self.role)
            .field("modules", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
