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

//! The Main-thread module: drains platform events.

use super::channel;
use crossbeam_channel::Receiver;
use strata_sdk::prelude::*;

/// An event raised by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The drawable surface changed size.
    Resized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// The window gained (`true`) or lost (`false`) focus.
    FocusChanged(bool),
    /// The user asked to close the application.
    CloseRequested,
}

/// Size of the drawable surface, published for the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

/// Pumps the platform event queue once per frame and ends the session on a
/// close request.
#[derive(Default)]
pub struct PlatformPump {
    events: Option<Receiver<PlatformEvent>>,
    surface: Option<SnapshotPublisher<SurfaceSize>>,
    focused: bool,
}

impl Module for PlatformPump {
    fn name(&self) -> &str {
        "platform_pump"
    }

    fn load(&mut self, ctx: &Context) -> ModuleResult<()> {
        let events = ctx.services().require::<Receiver<PlatformEvent>>()?;
        self.events = Some(events.clone());
        let surface = channel::<SnapshotChannel<SurfaceSize>>(ctx)?;
        self.surface = Some(surface.claim_publisher().map_err(anyhow::Error::from)?);
        Ok(())
    }

    fn start(&mut self, _ctx: &Context) -> ModuleResult<()> {
        self.focused = true;
        if let Some(surface) = self.surface.as_mut() {
            surface.publish(SurfaceSize::default());
        }
        Ok(())
    }

    fn pre_update(&mut self, ctx: &Context, _time: &FrameTime) -> ModuleResult<Flow> {
        let Some(events) = self.events.as_ref() else {
            return Ok(Flow::Continue);
        };

        for event in events.try_iter() {
            match event {
                PlatformEvent::Resized { width, height } => {
                    log::debug!("Surface resized to {width}x{height}.");
                    if let Some(surface) = self.surface.as_mut() {
                        surface.publish(SurfaceSize { width, height });
                    }
                }
                PlatformEvent::FocusChanged(focused) => {
                    if focused != self.focused {
                        log::debug!("Focus {}.", if focused { "gained" } else { "lost" });
                    }
                    self.focused = focused;
                }
                PlatformEvent::CloseRequested => {
                    log::info!("Close requested, stopping the session.");
                    ctx.request_stop();
                    return Ok(Flow::Stop);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

impl std::fmt::Debug for PlatformPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformPump")
            .field("focused", &self.focused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn context() -> (Context, crossbeam_channel::Sender<PlatformEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let surface = SnapshotChannel::<SurfaceSize>::new(SnapshotOptions::default()).unwrap();
        let ctx = Context::builder()
            .service(rx)
            .service(Arc::clone(&surface))
            .build();
        (ctx, tx)
    }

    #[test]
    fn test_resize_publishes_surface_size() {
        let (ctx, tx) = context();
        let mut pump = PlatformPump::default();
        pump.load(&ctx).unwrap();
        pump.start(&ctx).unwrap();

        tx.send(PlatformEvent::Resized {
            width: 640,
            height: 480,
        })
        .unwrap();
        let flow = pump.pre_update(&ctx, &FrameTime::default()).unwrap();

        assert_eq!(flow, Flow::Continue);
        let surface = channel::<SnapshotChannel<SurfaceSize>>(&ctx).unwrap();
        let latest = surface.read().unwrap();
        assert_eq!(
            latest.value,
            SurfaceSize {
                width: 640,
                height: 480
            }
        );
        assert_eq!(latest.version, 2);
    }

    #[test]
    fn test_close_request_cancels_session() {
        let (ctx, tx) = context();
        let mut pump = PlatformPump::default();
        pump.load(&ctx).unwrap();

        tx.send(PlatformEvent::FocusChanged(false)).unwrap();
        tx.send(PlatformEvent::CloseRequested).unwrap();
        let flow = pump.pre_update(&ctx, &FrameTime::default()).unwrap();

        assert_eq!(flow, Flow::Stop);
        assert!(ctx.is_cancelled());
    }
}
