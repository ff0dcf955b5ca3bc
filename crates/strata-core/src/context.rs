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

//! The shared session context.
//!
//! One [`Context`] is built per application run and shared, behind an `Arc`, by
//! every kernel. It is immutable after assembly except for its atomics: the
//! cancellation flag and the per-affinity frame counters.

use crate::{Affinity, CancellationToken, FacadeSink, LogSink, ServiceRegistry, Stopwatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Session state visible to every module phase.
///
/// This structure is shared by all kernels of a session, so everything in it
/// is either read-only or atomic.
pub struct Context {
    services: ServiceRegistry,
    cancellation: CancellationToken,
    active: Affinity,
    frames: [AtomicU64; Affinity::COUNT],
    uptime: Stopwatch,
    log_sink: Arc<dyn LogSink>,
}

impl Context {
    /// Starts building a context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Services registered during assembly.
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// The session-wide cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Shorthand for `cancellation().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Requests every kernel of the session to stop at its next iteration boundary.
    pub fn request_stop(&self) {
        self.cancellation.cancel();
    }

    /// The affinities that have a kernel in this session.
    pub fn active_affinities(&self) -> Affinity {
        self.active
    }

    /// Returns `true` if a kernel runs on `affinity` in this session.
    pub fn is_active(&self, affinity: Affinity) -> bool {
        self.active.contains(affinity) && !affinity.is_empty()
    }

    /// Number of frames the kernel on `affinity` completed so far.
    ///
    /// Returns 0 for inactive or combined affinities.
    pub fn frame_count(&self, affinity: Affinity) -> u64 {
        affinity
            .index()
            .map_or(0, |index| self.frames[index].load(Ordering::Acquire))
    }

    /// Marks one more completed frame for `affinity` and returns the new count.
    ///
    /// Called by kernels at the end of each iteration.
    pub fn advance_frame(&self, affinity: Affinity) -> u64 {
        affinity
            .index()
            .map_or(0, |index| self.frames[index].fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Time since the context was built.
    pub fn uptime(&self) -> Duration {
        self.uptime.elapsed()
    }

    /// The sink kernels report lifecycle events to.
    pub fn log_sink(&self) -> &dyn LogSink {
        self.log_sink.as_ref()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("services", &self.services)
            .field("cancellation", &self.cancellation)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Context`].
///
/// ```
/// use strata_core::{Affinity, CancellationToken, Context};
///
/// let token = CancellationToken::new();
/// let ctx = Context::builder()
///     .active_affinities(Affinity::GAME)
///     .cancellation(token.clone())
///     .build();
///
/// assert!(ctx.is_active(Affinity::GAME));
/// token.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    services: ServiceRegistry,
    cancellation: Option<CancellationToken>,
    active: Option<Affinity>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl ContextBuilder {
    /// Uses `services` as the session service registry.
    #[must_use]
    pub fn services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Registers one service.
    #[must_use]
    pub fn service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    /// Shares an existing cancellation token. A fresh one is created otherwise.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the active affinities. Defaults to [`Affinity::ALL`].
    #[must_use]
    pub fn active_affinities(mut self, active: Affinity) -> Self {
        self.active = Some(active);
        self
    }

    /// Replaces the default [`FacadeSink`].
    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Finishes the context. The uptime clock starts here.
    pub fn build(self) -> Context {
        Context {
            services: self.services,
            cancellation: self.cancellation.unwrap_or_default(),
            active: self.active.unwrap_or(Affinity::ALL),
            frames: std::array::from_fn(|_| AtomicU64::new(0)),
            uptime: Stopwatch::new(),
            log_sink: self.log_sink.unwrap_or_else(|| Arc::new(FacadeSink)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counters_are_per_affinity() {
        let ctx = Context::builder().build();
        assert_eq!(ctx.advance_frame(Affinity::GAME), 1);
        assert_eq!(ctx.advance_frame(Affinity::GAME), 2);
        assert_eq!(ctx.advance_frame(Affinity::RENDER), 1);

        assert_eq!(ctx.frame_count(Affinity::GAME), 2);
        assert_eq!(ctx.frame_count(Affinity::MAIN), 0);
        assert_eq!(ctx.frame_count(Affinity::ALL), 0);
    }

    #[test]
    fn test_defaults() {
        let ctx = Context::builder().build();
        assert_eq!(ctx.active_affinities(), Affinity::ALL);
        assert!(!ctx.is_cancelled());
        assert!(ctx.services().is_empty());
        assert!(!ctx.is_active(Affinity::EMPTY));
    }

    #[test]
    fn test_request_stop_reaches_shared_token() {
        let token = CancellationToken::new();
        let ctx = Context::builder().cancellation(token.clone()).build();
        ctx.request_stop();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_services_are_reachable() {
        let ctx = Context::builder().service(42u32).build();
        assert_eq!(ctx.services().get::<u32>(), Some(&42));
    }

    #[test]
    fn test_context_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
    }
}
