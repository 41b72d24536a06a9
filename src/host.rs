//! Headless stand-in for the browser page hosting a scene.
//!
//! The host owns the frame clock and the pointer. Each tick advances the
//! frame counter (starting at 1), replays the scripted pointer position and
//! asks the scene for a frame.

use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::RngCore;
use tiny_skia::Pixmap;

use crate::geometry::CanvasSize;
use crate::scene::{Orchestrator, PageAssets};
use crate::schema::Page;

/// Scripted pointer movement replayed one step per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PointerScript {
    /// Pointer never moves.
    #[default]
    Idle,
    /// Circle around the canvas center.
    Orbit {
        /// Radius as a fraction of the canvas width.
        radius_ratio: f32,
        period_frames: u32,
    },
}

impl PointerScript {
    pub fn position(&self, canvas: CanvasSize, frame: u64) -> Option<(f32, f32)> {
        match *self {
            Self::Idle => None,
            Self::Orbit {
                radius_ratio,
                period_frames,
            } => {
                let period = period_frames.max(1) as f32;
                let phase = (frame % u64::from(period_frames.max(1))) as f32 / period;
                let angle = phase * std::f32::consts::TAU;
                let radius = canvas.width * radius_ratio;
                let (cx, cy) = canvas.center();
                Some((cx + radius * angle.cos(), cy + radius * angle.sin()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub frames: u64,
    pub pointer_events: u64,
    pub pointer_glitch_outs: u64,
}

pub struct HeadlessHost<R: RngCore = StdRng> {
    scene: Orchestrator<R>,
    script: PointerScript,
    frame: u64,
    stats: HostStats,
}

impl<R: RngCore> HeadlessHost<R> {
    /// Create the scene and deliver its assets.
    pub fn mount(page: Page, assets: PageAssets, script: PointerScript, rng: R) -> Result<Self> {
        let mut scene = Orchestrator::new(page, rng)?;
        scene.on_assets_loaded(assets)?;
        Ok(Self {
            scene,
            script,
            frame: 0,
            stats: HostStats::default(),
        })
    }

    pub fn scene(&self) -> &Orchestrator<R> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Orchestrator<R> {
        &mut self.scene
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Wall-clock time covered by the frames drawn so far.
    pub fn elapsed(&self) -> Duration {
        let fps = self.scene.page().timing.fps.max(1);
        Duration::from_secs_f64(self.frame as f64 / f64::from(fps))
    }

    pub fn tick(&mut self) -> Result<&Pixmap> {
        self.frame += 1;
        let canvas = self.scene.canvas_size();
        if let Some((x, y)) = self.script.position(canvas, self.frame) {
            self.stats.pointer_events += 1;
            if self.scene.pointer_moved(x, y).is_some() {
                self.stats.pointer_glitch_outs += 1;
            }
        }
        self.stats.frames += 1;
        self.scene.draw_frame(self.frame)
    }

    pub fn resize(&mut self, width: u32, height: Option<u32>) -> Result<()> {
        self.scene.resize(width, height)
    }

    /// Tear the scene down and return what the host observed.
    pub fn unmount(mut self) -> HostStats {
        self.scene.teardown();
        tracing::debug!(
            frames = self.stats.frames,
            pointer_glitch_outs = self.stats.pointer_glitch_outs,
            "host unmounted"
        );
        self.stats
    }
}
