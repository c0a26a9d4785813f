//! Reaction-diffusion feedback loop on a ping-pong multi-target.
//!
//! Keys: `S` saves the mirrored color attachment as PNG, `R` reseeds,
//! `Escape` quits.

mod sim;

use std::path::PathBuf;

use anyhow::Result;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use pingpong_engine::core::{App, AppControl, FrameCtx};
use pingpong_engine::device::GpuInit;
use pingpong_engine::logging::{init_logging, LoggingConfig};
use pingpong_engine::paint::Color;
use pingpong_engine::window::{Runtime, RuntimeConfig};

use sim::{Sim, SimConfig};

struct Demo {
    config: SimConfig,
    sim: Option<Sim>,
    snapshot_requested: bool,
    reseed_requested: bool,
}

impl Demo {
    fn new(config: SimConfig) -> Self {
        Self {
            config,
            sim: None,
            snapshot_requested: false,
            reseed_requested: false,
        }
    }
}

impl App for Demo {
    fn on_window_event(&mut self, _id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            PhysicalKey::Code(KeyCode::KeyS) => self.snapshot_requested = true,
            PhysicalKey::Code(KeyCode::KeyR) => self.reseed_requested = true,
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.sim.is_none() {
            match Sim::new(ctx.gpu.device(), ctx.gpu.queue(), self.config.clone()) {
                Ok(sim) => self.sim = Some(sim),
                Err(e) => {
                    log::error!("{e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(sim) = self.sim.as_mut() else {
            return AppControl::Exit;
        };

        if std::mem::take(&mut self.reseed_requested) {
            sim.reseed();
        }
        if let Err(e) = sim.step(ctx.gpu.queue()) {
            log::error!("simulation step failed: {e:#}");
            return AppControl::Exit;
        }

        if std::mem::take(&mut self.snapshot_requested) {
            let path = PathBuf::from(format!("pingpong-{:06}.png", ctx.frame_index));
            if let Err(e) = sim.save_snapshot(&path) {
                log::error!("{e:#}");
            }
        }

        ctx.render(Color::new(0.02, 0.02, 0.03, 1.0), |rctx, target| {
            sim.present(rctx, target);
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "pingpong: reaction-diffusion".to_string(),
        initial_size: LogicalSize::new(1536.0, 560.0),
    };
    Runtime::run(runtime, GpuInit::default(), Demo::new(SimConfig::default()))
}
