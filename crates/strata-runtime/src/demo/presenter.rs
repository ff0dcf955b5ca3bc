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

//! The Render-thread module: consumes simulation output and "draws" it.

use super::{channel, Command, SurfaceSize, WorldState};
use std::collections::HashMap;
use std::sync::Arc;
use strata_sdk::prelude::*;

/// Mirrors the simulation from its command stream and checks the mirror
/// against the latest world snapshot.
pub struct Presenter {
    commands: Option<RingReader<Command>>,
    world: Option<Arc<SnapshotChannel<WorldState>>>,
    surface: Option<Arc<SnapshotChannel<SurfaceSize>>>,
    mirror: HashMap<u32, (f32, f32)>,
    frame_limit: Option<u64>,
    last_version: u64,
    presented: u64,
}

impl Presenter {
    /// Creates a presenter that ends the session after `frame_limit` frames, if set.
    pub fn new(frame_limit: Option<u64>) -> Self {
        Self {
            commands: None,
            world: None,
            surface: None,
            mirror: HashMap::new(),
            frame_limit,
            last_version: 0,
            presented: 0,
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Spawn { id, x, y } | Command::Move { id, x, y } => {
                self.mirror.insert(id, (x, y));
            }
            Command::Despawn { id } => {
                self.mirror.remove(&id);
            }
        }
    }
}

impl Module for Presenter {
    fn name(&self) -> &str {
        "presenter"
    }

    fn load(&mut self, ctx: &Context) -> ModuleResult<()> {
        let commands = channel::<RingChannel<Command>>(ctx)?;
        self.commands = Some(commands.claim_reader().map_err(anyhow::Error::from)?);
        self.world = Some(channel::<SnapshotChannel<WorldState>>(ctx)?);
        self.surface = Some(channel::<SnapshotChannel<SurfaceSize>>(ctx)?);
        Ok(())
    }

    fn update(&mut self, _ctx: &Context, _time: &FrameTime) -> ModuleResult<Flow> {
        let batch: Vec<Command> = match self.commands.as_mut() {
            Some(reader) => reader.drain().collect(),
            None => Vec::new(),
        };
        for command in batch {
            self.apply(command);
        }
        Ok(Flow::Continue)
    }

    fn late_update(&mut self, _ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        let Some(snapshot) = self.world.as_ref().and_then(|world| world.read()) else {
            return Ok(Flow::Continue);
        };
        if snapshot.version == self.last_version {
            return Ok(Flow::Continue);
        }
        self.last_version = snapshot.version;

        let size = self
            .surface
            .as_ref()
            .and_then(|surface| surface.read())
            .map(|latest| latest.value)
            .unwrap_or_default();
        log::trace!(
            "Frame {}: world tick {} with {} entities ({} mirrored) on {}x{}, alpha {:.2}.",
            time.frame,
            snapshot.value.tick,
            snapshot.value.entities.len(),
            self.mirror.len(),
            size.width,
            size.height,
            time.alpha
        );
        Ok(Flow::Continue)
    }

    fn post_update(&mut self, ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        self.presented = time.frame + 1;
        match self.frame_limit {
            Some(limit) if self.presented >= limit => {
                log::info!("Presented {limit} frames, stopping the session.");
                ctx.request_stop();
                Ok(Flow::Stop)
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn shutdown(&mut self, _ctx: &Context) -> ModuleResult<()> {
        log::info!(
            "Presenter stopped after {} frames, {} entities on screen.",
            self.presented,
            self.mirror.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (Context, RingWriter<Command>, SnapshotPublisher<WorldState>) {
        let ring = RingChannel::<Command>::new(
            16,
            RingOptions::default().drop_mode(DropMode::NO_CONSUMER_YET),
        )
        .unwrap();
        let world = SnapshotChannel::<WorldState>::new(SnapshotOptions::default()).unwrap();
        let surface = SnapshotChannel::<SurfaceSize>::new(SnapshotOptions::default()).unwrap();
        let writer = ring.claim_writer().unwrap();
        let publisher = world.claim_publisher().unwrap();
        let ctx = Context::builder()
            .service(ring)
            .service(world)
            .service(surface)
            .build();
        (ctx, writer, publisher)
    }

    #[test]
    fn test_mirror_follows_command_stream() {
        let (ctx, mut writer, _publisher) = context();
        let mut presenter = Presenter::new(None);
        presenter.load(&ctx).unwrap();

        // Nothing has been read yet, so the ring discards writes.
        assert!(writer.try_write(Command::Despawn { id: 9 }).is_err());
        presenter.update(&ctx, &FrameTime::default()).unwrap();
        assert!(presenter.mirror.is_empty());

        writer.try_write(Command::Spawn { id: 1, x: 0.0, y: 0.0 }).unwrap();
        writer.try_write(Command::Spawn { id: 2, x: 0.0, y: 0.0 }).unwrap();
        writer.try_write(Command::Move { id: 1, x: 3.0, y: 4.0 }).unwrap();
        writer.try_write(Command::Despawn { id: 2 }).unwrap();
        presenter.update(&ctx, &FrameTime::default()).unwrap();

        assert_eq!(presenter.mirror.len(), 1);
        assert_eq!(presenter.mirror.get(&1), Some(&(3.0, 4.0)));
    }

    #[test]
    fn test_late_update_tracks_new_snapshots_only() {
        let (ctx, _writer, mut publisher) = context();
        let mut presenter = Presenter::new(None);
        presenter.load(&ctx).unwrap();

        presenter.late_update(&ctx, &FrameTime::default()).unwrap();
        assert_eq!(presenter.last_version, 0);

        publisher.publish(WorldState {
            tick: 7,
            entities: Vec::new(),
        });
        presenter.late_update(&ctx, &FrameTime::default()).unwrap();
        assert_eq!(presenter.last_version, 1);
    }

    #[test]
    fn test_frame_limit_requests_stop() {
        let (ctx, _writer, _publisher) = context();
        let mut presenter = Presenter::new(Some(3));
        presenter.load(&ctx).unwrap();

        let mut time = FrameTime::default();
        for frame in 0..2 {
            time.frame = frame;
            assert_eq!(presenter.post_update(&ctx, &time).unwrap(), Flow::Continue);
        }
        time.frame = 2;
        assert_eq!(presenter.post_update(&ctx, &time).unwrap(), Flow::Stop);
        assert!(ctx.is_cancelled());
    }
}
