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

//! The Game-thread module: a small particle simulation.

use super::channel;
use std::f32::consts::TAU;
use strata_sdk::prelude::*;

const SPAWN_INTERVAL: u64 = 30;
const MAX_ENTITIES: usize = 64;
const SPEED: f32 = 20.0;
const BOUNDS: f32 = 100.0;

/// A change to the world, streamed from the simulation to the presenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// A new entity appeared.
    Spawn { id: u32, x: f32, y: f32 },
    /// An entity moved to a new position.
    Move { id: u32, x: f32, y: f32 },
    /// An entity left the world.
    Despawn { id: u32 },
}

/// One simulated entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// The full simulation state, published once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldState {
    /// Fixed ticks simulated so far.
    pub tick: u64,
    /// Live entities, oldest first.
    pub entities: Vec<Entity>,
}

/// Steps the world on every fixed tick, then flushes the tick's commands and
/// publishes the world once per frame.
#[derive(Default)]
pub struct Simulation {
    commands: Option<RingWriter<Command>>,
    world: Option<SnapshotPublisher<WorldState>>,
    pending: Option<DoubleBufferedQueue<Command>>,
    state: WorldState,
    next_id: u32,
}

impl Simulation {
    fn spawn(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        // Golden-angle headings spread entities evenly.
        let heading = (id as f32 * 0.618_034).fract() * TAU;
        Entity {
            id,
            x: 0.0,
            y: 0.0,
            vx: heading.cos() * SPEED,
            vy: heading.sin() * SPEED,
        }
    }

    fn step(&mut self, dt: f32, pending: &mut DoubleBufferedQueue<Command>) {
        self.state.tick += 1;

        if self.state.tick % SPAWN_INTERVAL == 1 && self.state.entities.len() < MAX_ENTITIES {
            let entity = self.spawn();
            pending.push(Command::Spawn {
                id: entity.id,
                x: entity.x,
                y: entity.y,
            });
            self.state.entities.push(entity);
        }

        for entity in &mut self.state.entities {
            entity.x += entity.vx * dt;
            entity.y += entity.vy * dt;
            pending.push(Command::Move {
                id: entity.id,
                x: entity.x,
                y: entity.y,
            });
        }

        self.state.entities.retain(|entity| {
            let inside = entity.x.abs() <= BOUNDS && entity.y.abs() <= BOUNDS;
            if !inside {
                pending.push(Command::Despawn { id: entity.id });
            }
            inside
        });
    }
}

impl Module for Simulation {
    fn name(&self) -> &str {
        "simulation"
    }

    fn load(&mut self, ctx: &Context) -> ModuleResult<()> {
        let commands = channel::<RingChannel<Command>>(ctx)?;
        let world = channel::<SnapshotChannel<WorldState>>(ctx)?;
        self.commands = Some(commands.claim_writer().map_err(anyhow::Error::from)?);
        self.world = Some(world.claim_publisher().map_err(anyhow::Error::from)?);
        self.pending = Some(
            DoubleBufferedQueue::with_capacity(64, CapacityPolicy::Grow)
                .map_err(anyhow::Error::from)?,
        );
        Ok(())
    }

    fn fixed_update(&mut self, _ctx: &Context, time: &FrameTime) -> ModuleResult<Flow> {
        let Some(mut pending) = self.pending.take() else {
            return Ok(Flow::Continue);
        };
        self.step(time.fixed_delta.as_secs_f32(), &mut pending);
        self.pending = Some(pending);
        Ok(Flow::Continue)
    }

    fn update(&mut self, ctx: &Context, _time: &FrameTime) -> ModuleResult<Flow> {
        if let (Some(pending), Some(commands)) = (self.pending.as_mut(), self.commands.as_mut()) {
            for command in pending.swap_and_read() {
                commands.write(*command, ctx.cancellation())?;
            }
        }
        if let Some(world) = self.world.as_mut() {
            world.publish(self.state.clone());
        }
        Ok(Flow::Continue)
    }

    fn shutdown(&mut self, _ctx: &Context) -> ModuleResult<()> {
        if let Some(commands) = self.commands.as_ref() {
            let stats = commands.channel().stats();
            log::info!(
                "Simulation stopped at tick {}: {} commands written, {} dropped.",
                self.state.tick,
                stats.written,
                stats.dropped
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn frame_time() -> FrameTime {
        FrameTime {
            fixed_delta: Duration::from_millis(100),
            ..Default::default()
        }
    }

    #[test]
    fn test_commands_reach_the_reader_in_tick_order() {
        let ring = RingChannel::<Command>::new(256, RingOptions::default()).unwrap();
        let world = SnapshotChannel::<WorldState>::new(SnapshotOptions::default()).unwrap();
        let ctx = Context::builder()
            .service(Arc::clone(&ring))
            .service(Arc::clone(&world))
            .build();
        let mut reader = ring.claim_reader().unwrap();

        let mut simulation = Simulation::default();
        simulation.load(&ctx).unwrap();
        for _ in 0..3 {
            simulation.fixed_update(&ctx, &frame_time()).unwrap();
        }
        simulation.update(&ctx, &frame_time()).unwrap();

        let received: Vec<Command> = reader.drain().collect();
        assert_eq!(received.len(), 4);
        assert!(matches!(received[0], Command::Spawn { id: 0, .. }));
        assert!(received[1..]
            .iter()
            .all(|command| matches!(command, Command::Move { id: 0, .. })));

        let latest = world.read().unwrap();
        assert_eq!(latest.value.tick, 3);
        assert_eq!(latest.value.entities.len(), 1);
    }

    #[test]
    fn test_entities_leaving_bounds_are_despawned() {
        let mut simulation = Simulation::default();
        let mut pending = DoubleBufferedQueue::with_capacity(16, CapacityPolicy::Grow).unwrap();

        // One spawn, then enough ticks at 1 s each to cross the bounds.
        for _ in 0..6 {
            simulation.step(1.0, &mut pending);
        }

        assert!(simulation.state.entities.is_empty());
        let batch = pending.swap_and_read();
        assert_eq!(batch.last(), Some(&Command::Despawn { id: 0 }));
    }

    #[test]
    fn test_second_simulation_cannot_claim_the_writer() {
        let ring = RingChannel::<Command>::new(8, RingOptions::default()).unwrap();
        let world = SnapshotChannel::<WorldState>::new(SnapshotOptions::default()).unwrap();
        let ctx = Context::builder().service(ring).service(world).build();

        let mut first = Simulation::default();
        first.load(&ctx).unwrap();
        let mut second = Simulation::default();
        assert!(second.load(&ctx).is_err());
    }
}
