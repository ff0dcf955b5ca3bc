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

//! The per-affinity kernel: one thread, one ordered set of modules.

use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::registry::resolve_load_order;
use crate::timestep::FixedTimestep;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use strata_core::{
    Affinity, Context, ExitCode, ExitCodeCell, Flow, FrameTime, LogSinkExt, Module,
    ModuleDescriptor, ModuleError, ModuleResult, Phase, PhaseCell, Stopwatch,
};

/// Steady-state phases that run once per frame, after the fixed ticks.
const FRAME_PHASES: [Phase; 4] = [
    Phase::PreUpdate,
    Phase::Update,
    Phase::LateUpdate,
    Phase::PostUpdate,
];

/// A module instance owned by a running kernel.
struct LoadedModule {
    name: String,
    module: Box<dyn Module>,
}

/// Drives the modules of one affinity through their lifecycle.
///
/// A kernel is built by the orchestrator, then either [`spawn`](Self::spawn)ed
/// on a thread named `strata-<affinity>` or [`run`](Self::run) on the current
/// thread. It stops when the shared cancellation token fires, when a module
/// returns [`Flow::Stop`] or [`Flow::Fault`], or when startup fails.
pub struct Kernel {
    affinity: Affinity,
    descriptors: Vec<ModuleDescriptor>,
    config: KernelConfig,
    context: Arc<Context>,
    exit: ExitCodeCell,
    phase: PhaseCell,
    target: String,
}

impl Kernel {
    /// Creates a kernel for `affinity` over `descriptors`.
    ///
    /// Descriptors bound to another affinity are ignored with a warning.
    pub fn new(
        affinity: Affinity,
        descriptors: Vec<ModuleDescriptor>,
        config: KernelConfig,
        context: Arc<Context>,
    ) -> Self {
        let (descriptors, foreign): (Vec<_>, Vec<_>) = descriptors
            .into_iter()
            .partition(|descriptor| descriptor.affinity() == affinity);
        for descriptor in &foreign {
            log::warn!(
                "Kernel {}: ignoring {} bound to {}",
                affinity,
                descriptor.id(),
                descriptor.affinity()
            );
        }

        Self {
            affinity,
            descriptors,
            config,
            context,
            exit: ExitCodeCell::new(),
            phase: PhaseCell::new(),
            target: format!("strata::kernel::{}", affinity.name()),
        }
    }

    /// The affinity this kernel runs.
    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Number of modules the kernel will load.
    pub fn module_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Starts the kernel on its own named thread.
    pub fn spawn(self) -> Result<KernelHandle, KernelError> {
        let affinity = self.affinity;
        let exit = self.exit.clone();
        let phase = self.phase.clone();
        let handle = thread::Builder::new()
            .name(format!("strata-{}", affinity.name()))
            .spawn(move || self.run())
            .map_err(|source| KernelError::Spawn { affinity, source })?;

        Ok(KernelHandle {
            affinity,
            exit,
            phase,
            handle,
        })
    }

    /// Runs the whole lifecycle on the current thread and returns the exit code.
    ///
    /// A panic inside a module phase is contained and reported like an error
    /// from that phase.
    pub fn run(self) -> ExitCode {
        let Kernel {
            affinity,
            descriptors,
            config,
            context,
            exit,
            phase,
            target,
        } = self;
        let ctx = context.as_ref();
        let sink = ctx.log_sink();

        // Stays Fatal unless startup completes, so an uncontained panic before
        // then is not reported as a clean exit.
        exit.record(ExitCode::Fatal);

        sink.info(
            &target,
            &format!("Kernel {affinity} starting with {} modules.", descriptors.len()),
        );

        let mut modules = Vec::with_capacity(descriptors.len());
        let startup = config
            .validate()
            .and_then(|()| Self::start_up(&descriptors, &mut modules, ctx, &phase));

        let mut code = match startup {
            Ok(()) => {
                exit.record(ExitCode::Ok);
                Self::steady_state(affinity, &config, &mut modules, ctx, &target, &exit, &phase)
            }
            Err(error) => {
                let code = error.exit_code();
                if code == ExitCode::Canceled {
                    sink.info(&target, "Startup cancelled.");
                } else {
                    sink.fatal(&target, "Startup failed", &error);
                }
                code
            }
        };
        exit.escalate(code);

        phase.set(Phase::Shutdown);
        if Self::shut_down(&mut modules, ctx, &target) {
            code = code.max(ExitCode::Recoverable);
        }
        exit.record(code);

        sink.info(&target, &format!("Kernel {affinity} stopped with {code}."));
        code
    }

    /// Load, Initialize and Start, in load order. Loaded modules are pushed to
    /// `modules` as they load so that a failure can shut them down.
    fn start_up(
        descriptors: &[ModuleDescriptor],
        modules: &mut Vec<LoadedModule>,
        ctx: &Context,
        current: &PhaseCell,
    ) -> Result<(), KernelError> {
        let order = resolve_load_order(descriptors)?;

        current.set(Phase::Load);
        for index in order {
            let descriptor = &descriptors[index];
            Self::check_cancelled(ctx, Phase::Load, descriptor.id().name())?;
            let mut module = guarded(|| Ok(descriptor.instantiate())).map_err(|source| {
                Self::startup_error(descriptor.id().name(), Phase::Load, source)
            })?;
            let name = module.name().to_string();
            guarded(|| module.load(ctx))
                .map_err(|source| Self::startup_error(&name, Phase::Load, source))?;
            modules.push(LoadedModule { name, module });
        }

        for phase in [Phase::Initialize, Phase::Start] {
            current.set(phase);
            for entry in modules.iter_mut() {
                Self::check_cancelled(ctx, phase, &entry.name)?;
                let module = &mut entry.module;
                let result = guarded(|| match phase {
                    Phase::Initialize => module.initialize(ctx),
                    _ => module.start(ctx),
                });
                result.map_err(|source| Self::startup_error(&entry.name, phase, source))?;
            }
        }
        Ok(())
    }

    fn check_cancelled(ctx: &Context, phase: Phase, module: &str) -> Result<(), KernelError> {
        if ctx.is_cancelled() {
            return Err(Self::startup_error(module, phase, ModuleError::Cancelled));
        }
        Ok(())
    }

    fn startup_error(module: &str, phase: Phase, source: ModuleError) -> KernelError {
        KernelError::Module {
            module: module.to_string(),
            phase,
            source,
        }
    }

    fn steady_state(
        affinity: Affinity,
        config: &KernelConfig,
        modules: &mut [LoadedModule],
        ctx: &Context,
        target: &str,
        exit: &ExitCodeCell,
        current: &PhaseCell,
    ) -> ExitCode {
        let mut timestep = FixedTimestep::new(config.fixed_step(), config.max_fixed_steps_per_frame);
        let frame_budget = config.frame_budget();
        let clock = Stopwatch::new();
        let mut last_frame = Instant::now();
        let mut frame = 0u64;
        let mut fixed_tick = 0u64;

        loop {
            if ctx.is_cancelled() {
                log::debug!("Kernel {affinity}: cancellation observed after {frame} frames.");
                return ExitCode::Ok;
            }

            let frame_start = Instant::now();
            let delta = frame_start - last_frame;
            last_frame = frame_start;
            timestep.advance(delta);

            let mut time = FrameTime {
                delta,
                fixed_delta: timestep.step(),
                elapsed: clock.elapsed(),
                frame,
                fixed_tick,
                alpha: 0.0,
            };

            let mut flow = Flow::Continue;
            while flow == Flow::Continue && timestep.consume_step() {
                current.set(Phase::FixedUpdate);
                flow = Self::run_phase(modules, Phase::FixedUpdate, ctx, &time, target);
                fixed_tick += 1;
                time.fixed_tick = fixed_tick;
            }
            time.alpha = timestep.alpha();

            for phase in FRAME_PHASES {
                if flow != Flow::Continue {
                    break;
                }
                current.set(phase);
                flow = Self::run_phase(modules, phase, ctx, &time, target);
            }

            frame += 1;
            ctx.advance_frame(affinity);

            match flow {
                Flow::Continue => {}
                Flow::Stop => {
                    log::debug!("Kernel {affinity}: stop requested by a module.");
                    return ExitCode::Ok;
                }
                Flow::Fault => {
                    exit.escalate(ExitCode::Recoverable);
                    ctx.log_sink()
                        .warn(target, "A module reported a fault, stopping kernel.");
                    return ExitCode::Recoverable;
                }
            }

            match frame_budget {
                Some(budget) => {
                    let spent = frame_start.elapsed();
                    if spent < budget {
                        thread::sleep(budget - spent);
                    }
                }
                None => thread::yield_now(),
            }
        }
    }

    /// Runs one steady-state phase over every module, in load order.
    fn run_phase(
        modules: &mut [LoadedModule],
        phase: Phase,
        ctx: &Context,
        time: &FrameTime,
        target: &str,
    ) -> Flow {
        let mut flow = Flow::Continue;
        for entry in modules.iter_mut() {
            let module = &mut entry.module;
            let result = guarded(|| match phase {
                Phase::FixedUpdate => module.fixed_update(ctx, time),
                Phase::PreUpdate => module.pre_update(ctx, time),
                Phase::Update => module.update(ctx, time),
                Phase::LateUpdate => module.late_update(ctx, time),
                Phase::PostUpdate => module.post_update(ctx, time),
                _ => Ok(Flow::Continue),
            });

            match result {
                Ok(outcome) => flow = flow.merge(outcome),
                Err(ModuleError::Cancelled) => flow = flow.merge(Flow::Stop),
                Err(error) => ctx.log_sink().error(
                    target,
                    &format!("{} failed during {phase}", entry.name),
                    &error,
                ),
            }
        }
        flow
    }

    /// Shuts modules down in reverse load order. Returns `true` if any failed.
    fn shut_down(modules: &mut Vec<LoadedModule>, ctx: &Context, target: &str) -> bool {
        let mut failed = false;
        while let Some(mut entry) = modules.pop() {
            let module = &mut entry.module;
            if let Err(error) = guarded(|| module.shutdown(ctx)) {
                failed = true;
                ctx.log_sink().error(
                    target,
                    &format!("{} failed during shutdown", entry.name),
                    &error,
                );
            }
        }
        failed
    }
}

/// Runs one module call, turning a panic into [`ModuleError::Panicked`].
fn guarded<R>(call: impl FnOnce() -> ModuleResult<R>) -> ModuleResult<R> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(ModuleError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("affinity", &self.affinity)
            .field("modules", &self.descriptors.len())
            .field("config", &self.config)
            .finish()
    }
}

/// A running kernel thread.
#[derive(Debug)]
pub struct KernelHandle {
    affinity: Affinity,
    exit: ExitCodeCell,
    phase: PhaseCell,
    handle: thread::JoinHandle<ExitCode>,
}

impl KernelHandle {
    /// The kernel's affinity.
    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// The exit code the kernel recorded most recently.
    pub fn last_exit_code(&self) -> ExitCode {
        self.exit.get()
    }

    /// The lifecycle phase the kernel is in, `None` before it starts loading.
    ///
    /// Reports [`Phase::Shutdown`] once the kernel has stopped.
    pub fn current_phase(&self) -> Option<Phase> {
        self.phase.get()
    }

    /// Returns `true` once the kernel thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the kernel thread.
    ///
    /// # Errors
    ///
    /// [`KernelError::Panicked`] if the thread panicked. The error carries the
    /// last exit code the kernel recorded.
    pub fn join(self) -> Result<ExitCode, KernelError> {
        let KernelHandle {
            affinity,
            exit,
            handle,
            ..
        } = self;
        handle.join().map_err(|payload| KernelError::Panicked {
            affinity,
            message: panic_message(payload.as_ref()),
            last_recorded: exit.get(),
        })
    }
}
