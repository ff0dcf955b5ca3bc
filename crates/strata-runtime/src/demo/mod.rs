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

//! Demo modules showing one module per thread role, wired through the
//! session's shared channels.
//!
//! ```text
//! Main   PlatformPump ──(SurfaceSize snapshot)──────────────┐
//! Game   Simulation   ──(Command ring, WorldState snapshot)─┴─> Render Presenter
//! ```

mod platform;
mod presenter;
mod simulation;

pub use platform::{PlatformEvent, PlatformPump, SurfaceSize};
pub use presenter::Presenter;
pub use simulation::{Command, Entity, Simulation, WorldState};

use crossbeam_channel::Sender;
use std::sync::Arc;
use strata_sdk::prelude::*;

/// Capacity of the Game to Render command ring.
pub const COMMAND_CAPACITY: usize = 256;

/// Frame cap applied to every kernel when the configuration sets none.
pub const DEFAULT_FRAME_RATE_CAP: u32 = 120;

/// Caps uncapped kernels at [`DEFAULT_FRAME_RATE_CAP`].
///
/// Per-affinity overrides are left as configured.
pub fn with_default_frame_cap(mut config: RuntimeConfig) -> RuntimeConfig {
    if config.kernel.frame_rate_cap.is_none() {
        config.kernel.frame_rate_cap = Some(DEFAULT_FRAME_RATE_CAP);
    }
    config
}

/// Options of the demo session.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoOptions {
    /// Rendered frames after which the presenter ends the session.
    pub frame_limit: Option<u64>,
}

/// Creates the shared channels, stores them as services and registers the
/// three demo modules.
///
/// Returns the builder and the sending side of the platform event queue.
pub fn install(
    builder: ApplicationBuilder,
    options: DemoOptions,
) -> anyhow::Result<(ApplicationBuilder, Sender<PlatformEvent>)> {
    // A server session has no presenter; commands written before any reader
    // shows up are dropped instead of filling the ring.
    let commands = RingChannel::<Command>::new(
        COMMAND_CAPACITY,
        RingOptions::default().drop_mode(DropMode::NO_CONSUMER_YET),
    )?;
    let world = SnapshotChannel::<WorldState>::with_deduplication(
        SnapshotOptions::default().drop_mode(DropMode::NO_CONSUMER_YET),
    )?;
    let surface = SnapshotChannel::<SurfaceSize>::with_deduplication(SnapshotOptions::default())?;
    let (events_tx, events_rx) = crossbeam_channel::unbounded::<PlatformEvent>();

    let frame_limit = options.frame_limit;
    let builder = builder
        .service(commands)
        .service(world)
        .service(surface)
        .service(events_rx)
        .register(ModuleDescriptor::new::<PlatformPump>(
            Affinity::MAIN,
            PlatformPump::default,
        ))?
        .register(ModuleDescriptor::new::<Simulation>(
            Affinity::GAME,
            Simulation::default,
        ))?
        .register(ModuleDescriptor::new::<Presenter>(Affinity::RENDER, move || {
            Presenter::new(frame_limit)
        }))?;

    Ok((builder, events_tx))
}

/// Looks up a shared channel registered by [`install`].
fn channel<C: Send + Sync + 'static>(ctx: &Context) -> ModuleResult<Arc<C>> {
    ctx.services().require::<Arc<C>>().map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_host_session_stops_after_frame_limit() {
        let builder = Application::builder()
            .role(Role::Both)
            .config(with_default_frame_cap(RuntimeConfig::default()));
        let (builder, _events) = install(
            builder,
            DemoOptions {
                frame_limit: Some(30),
            },
        )
        .unwrap();
        let app = builder.build().unwrap();
        let ctx = Arc::clone(app.context());

        let code = thread::spawn(move || app.run()).join().unwrap();

        assert_eq!(code, ExitCode::Ok);
        assert!(ctx.frame_count(Affinity::RENDER) >= 30);
        assert!(ctx.is_cancelled());
        let commands = ctx
            .services()
            .get::<Arc<RingChannel<Command>>>()
            .unwrap()
            .stats();
        assert!(commands.read > 0);
        assert_eq!(commands.read, commands.written - commands.len as u64);
    }

    #[test]
    fn test_close_request_ends_client_session() {
        let builder = Application::builder().role(Role::Client);
        let (builder, events) = install(builder, DemoOptions::default()).unwrap();
        let app = builder.build().unwrap();
        let ctx = Arc::clone(app.context());
        let session = thread::spawn(move || app.run());

        // A close request during startup would leave the other kernels Canceled.
        while ![Affinity::MAIN, Affinity::GAME, Affinity::RENDER]
            .into_iter()
            .all(|affinity| ctx.frame_count(affinity) > 0)
        {
            thread::yield_now();
        }
        events
            .send(PlatformEvent::Resized {
                width: 1280,
                height: 720,
            })
            .unwrap();
        events.send(PlatformEvent::CloseRequested).unwrap();

        assert_eq!(session.join().unwrap(), ExitCode::Ok);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_close_request_during_startup_cancels_siblings() {
        let builder = Application::builder().role(Role::Client);
        let (builder, events) = install(builder, DemoOptions::default()).unwrap();
        let app = builder.build().unwrap();
        events.send(PlatformEvent::CloseRequested).unwrap();

        let code = thread::spawn(move || app.run()).join().unwrap();
        assert!(matches!(code, ExitCode::Ok | ExitCode::Canceled));
    }

    #[test]
    fn test_default_frame_cap_keeps_explicit_values() {
        let capped = with_default_frame_cap(RuntimeConfig::default());
        assert_eq!(capped.kernel.frame_rate_cap, Some(DEFAULT_FRAME_RATE_CAP));

        let mut config = RuntimeConfig::default();
        config.kernel.frame_rate_cap = Some(30);
        assert_eq!(with_default_frame_cap(config).kernel.frame_rate_cap, Some(30));
    }

    #[test]
    fn test_server_session_runs_simulation_alone() {
        let builder = Application::builder().role(Role::Server);
        let (builder, _events) = install(builder, DemoOptions::default()).unwrap();
        let app = builder.build().unwrap();
        let token = app.cancellation_token();
        let ctx = Arc::clone(app.context());

        let session = thread::spawn(move || app.run());
        while ctx.frame_count(Affinity::GAME) < 10 {
            thread::yield_now();
        }
        token.cancel();

        assert_eq!(session.join().unwrap(), ExitCode::Ok);
        assert_eq!(ctx.frame_count(Affinity::RENDER), 0);
        let commands = ctx
            .services()
            .get::<Arc<RingChannel<Command>>>()
            .unwrap();
        assert_eq!(commands.stats().read, 0);
    }
}
