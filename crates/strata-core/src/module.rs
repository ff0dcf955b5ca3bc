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

//! The module lifecycle contract.
//!
//! A [`Module`] is a unit of behavior bound to one [`Affinity`]. Its kernel
//! drives it through a fixed sequence of phases:
//!
//! ```text
//! Load -> Initialize -> Start -> ( FixedUpdate* -> PreUpdate -> Update -> LateUpdate -> PostUpdate )* -> Shutdown
//! ```
//!
//! Every phase has a default no-op implementation, so a module only overrides
//! what it needs. Modules are created by their kernel at load time from the
//! factory in their [`ModuleDescriptor`], and never outlive that kernel.

use crate::{Affinity, Cancelled, Context};
use std::any::TypeId;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A failure reported by a module phase.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The phase stopped because cooperative cancellation was requested.
    #[error("cancelled")]
    Cancelled,
    /// A required service was not registered in the context.
    #[error("missing service `{0}`")]
    MissingService(&'static str),
    /// A module-specific failure.
    #[error("{0}")]
    Failed(String),
    /// The phase panicked. Carries the panic message.
    #[error("panicked: {0}")]
    Panicked(String),
    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Cancelled> for ModuleError {
    fn from(_: Cancelled) -> Self {
        ModuleError::Cancelled
    }
}

/// Result type returned by module phases.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Outcome of one steady-state phase, checked by the kernel after each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep running.
    #[default]
    Continue,
    /// Stop this kernel in an orderly fashion.
    Stop,
    /// Stop this kernel gracefully and report a recoverable error.
    Fault,
}

impl Flow {
    /// Combines two outcomes, keeping the one that ends the loop hardest.
    #[must_use]
    pub fn merge(self, other: Flow) -> Flow {
        match (self, other) {
            (Flow::Fault, _) | (_, Flow::Fault) => Flow::Fault,
            (Flow::Stop, _) | (_, Flow::Stop) => Flow::Stop,
            _ => Flow::Continue,
        }
    }
}

/// Lifecycle phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Acquire resources and wire channels.
    Load,
    /// Prepare state that depends on other modules being loaded.
    Initialize,
    /// Last call before the steady-state loop.
    Start,
    /// Fixed-cadence tick, zero or more times per frame.
    FixedUpdate,
    /// First variable-cadence phase of a frame.
    PreUpdate,
    /// Main variable-cadence phase.
    Update,
    /// Runs after every module's update.
    LateUpdate,
    /// Last phase of a frame.
    PostUpdate,
    /// Release resources. Runs in reverse load order.
    Shutdown,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 9] = [
        Phase::Load,
        Phase::Initialize,
        Phase::Start,
        Phase::FixedUpdate,
        Phase::PreUpdate,
        Phase::Update,
        Phase::LateUpdate,
        Phase::PostUpdate,
        Phase::Shutdown,
    ];

    /// Returns `true` for phases whose failure is fatal to the kernel.
    pub const fn is_startup(self) -> bool {
        matches!(self, Phase::Load | Phase::Initialize | Phase::Start)
    }

    /// Short lowercase name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Initialize => "initialize",
            Phase::Start => "start",
            Phase::FixedUpdate => "fixed_update",
            Phase::PreUpdate => "pre_update",
            Phase::Update => "update",
            Phase::LateUpdate => "late_update",
            Phase::PostUpdate => "post_update",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A shared, thread-safe slot holding the phase a kernel is currently in.
///
/// Empty until the kernel enters [`Phase::Load`]. Once shutdown completes it
/// keeps reporting [`Phase::Shutdown`].
#[derive(Debug, Clone)]
pub struct PhaseCell {
    phase: Arc<AtomicU8>,
}

impl PhaseCell {
    const UNSET: u8 = u8::MAX;

    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(Self::UNSET)),
        }
    }

    /// Records `phase` as the current one.
    pub fn set(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// The current phase, or `None` before the kernel started loading.
    pub fn get(&self) -> Option<Phase> {
        Phase::ALL
            .get(usize::from(self.phase.load(Ordering::Acquire)))
            .copied()
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame timing handed to steady-state phases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Wall time since the previous frame.
    pub delta: Duration,
    /// Length of one fixed tick.
    pub fixed_delta: Duration,
    /// Time since the kernel entered its steady-state loop.
    pub elapsed: Duration,
    /// Frame counter of this kernel, starting at 0.
    pub frame: u64,
    /// Number of fixed ticks executed so far by this kernel.
    pub fixed_tick: u64,
    /// Fraction of a fixed tick left in the accumulator, in `[0, 1)`.
    /// Useful for interpolating between the last two simulation states.
    pub alpha: f32,
}

/// The lifecycle contract every schedulable unit implements.
///
/// All methods receive the shared session [`Context`]. Startup phases return
/// `ModuleResult<()>`; a failure there is fatal to the kernel. Steady-state
/// phases return a [`Flow`]; an `Err` is logged and the loop continues unless it
/// is [`ModuleError::Cancelled`].
#[allow(unused_variables)]
pub trait Module: Send + 'static {
    /// Display name, defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Acquire resources. Dependencies have completed their own load.
    fn load(&mut self, ctx: &Context) -> ModuleResult<()> {
        Ok(())
    }

    /// Runs once every module of the kernel is loaded.
    fn initialize(&mut self, ctx: &Context) -> ModuleResult<()> {
        Ok(())
    }

    /// Runs once every module of the kernel is initialized.
    fn start(&mut self, ctx: &Context) -> ModuleResult<()> {
        Ok(())
    }

    /// Fixed-cadence tick.
    fn fixed_update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        Ok(Flow::Continue)
    }

    /// First variable-cadence phase of a frame.
    fn pre_update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        Ok(Flow::Continue)
    }

    /// Main variable-cadence phase.
    fn update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        Ok(Flow::Continue)
    }

    /// Runs after every module's update.
    fn late_update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        Ok(Flow::Continue)
    }

    /// Last phase of a frame.
    fn post_update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        Ok(Flow::Continue)
    }

    /// Release resources. Called in reverse load order, also after a failed startup.
    fn shutdown(&mut self, ctx: &Context) -> ModuleResult<()> {
        Ok(())
    }
}

/// Identity of a module type, used to express dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId {
    type_id: TypeId,
    name: &'static str,
}

impl ModuleId {
    /// The id of module type `M`.
    pub fn of<M: Module>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    /// The type name of the module.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

type ModuleFactory = Box<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Registration entry for a module type: its affinity, its dependencies, and the
/// factory the kernel calls at load time.
///
/// ```
/// use strata_core::{Affinity, Module, ModuleDescriptor};
///
/// #[derive(Default)]
/// struct Assets;
/// impl Module for Assets {}
///
/// #[derive(Default)]
/// struct Simulation;
/// impl Module for Simulation {}
///
/// let descriptor = ModuleDescriptor::new::<Simulation>(Affinity::GAME, Simulation::default)
///     .depends_on::<Assets>();
/// assert_eq!(descriptor.dependencies().len(), 1);
/// ```
pub struct ModuleDescriptor {
    id: ModuleId,
    affinity: Affinity,
    dependencies: Vec<ModuleId>,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    /// Describes module type `M`, created by `factory`, running on `affinity`.
    ///
    /// `affinity` should name a single thread role; kernels only pick up
    /// descriptors whose affinity equals their own.
    pub fn new<M: Module>(
        affinity: Affinity,
        factory: impl Fn() -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: ModuleId::of::<M>(),
            affinity,
            dependencies: Vec::new(),
            factory: Box::new(move || Box::new(factory())),
        }
    }

    /// Declares that `D` must complete its load before this module loads.
    #[must_use]
    pub fn depends_on<D: Module>(mut self) -> Self {
        let dependency = ModuleId::of::<D>();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// The module type id.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// The affinity the module runs on.
    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Declared dependencies, in declaration order.
    pub fn dependencies(&self) -> &[ModuleId] {
        &self.dependencies
    }

    /// Creates a fresh module instance.
    pub fn instantiate(&self) -> Box<dyn Module> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field("affinity", &self.affinity)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Physics;
    impl Module for Physics {}

    #[derive(Default)]
    struct Gameplay;
    impl Module for Gameplay {
        fn name(&self) -> &str {
            "gameplay"
        }
    }

    #[test]
    fn test_flow_merge_keeps_the_hardest_stop() {
        assert_eq!(Flow::Continue.merge(Flow::Continue), Flow::Continue);
        assert_eq!(Flow::Continue.merge(Flow::Stop), Flow::Stop);
        assert_eq!(Flow::Stop.merge(Flow::Fault), Flow::Fault);
        assert_eq!(Flow::Fault.merge(Flow::Continue), Flow::Fault);
    }

    #[test]
    fn test_module_id_distinguishes_types() {
        assert_eq!(ModuleId::of::<Physics>(), ModuleId::of::<Physics>());
        assert_ne!(ModuleId::of::<Physics>(), ModuleId::of::<Gameplay>());
        assert!(ModuleId::of::<Physics>().name().ends_with("Physics"));
    }

    #[test]
    fn test_descriptor_dedupes_dependencies() {
        let descriptor = ModuleDescriptor::new::<Gameplay>(Affinity::GAME, Gameplay::default)
            .depends_on::<Physics>()
            .depends_on::<Physics>();
        assert_eq!(descriptor.dependencies(), &[ModuleId::of::<Physics>()]);
        assert_eq!(descriptor.affinity(), Affinity::GAME);
        assert_eq!(descriptor.instantiate().name(), "gameplay");
    }

    #[test]
    fn test_startup_phases() {
        assert!(Phase::Load.is_startup());
        assert!(Phase::Start.is_startup());
        assert!(!Phase::Update.is_startup());
        assert!(!Phase::Shutdown.is_startup());
    }

    #[test]
    fn test_phase_cell_tracks_latest_phase() {
        let cell = PhaseCell::new();
        assert_eq!(cell.get(), None);

        let observer = cell.clone();
        for phase in Phase::ALL {
            cell.set(phase);
            assert_eq!(observer.get(), Some(phase));
        }
    }

    #[test]
    fn test_cancelled_converts() {
        let error: ModuleError = Cancelled.into();
        assert!(matches!(error, ModuleError::Cancelled));
    }
}
