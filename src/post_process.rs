//! Full-frame post-processing stage.
//!
//! The composed buffer is handed to a [`PostProcess`] implementation once per
//! frame, after every block has been drawn, together with a [`PostUniforms`]
//! snapshot (resolution, frame, pointer, time). The stage returns the visible
//! frame; the layout engine never looks inside it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

use crate::channel_displacement::ChannelDisplacement;
use crate::geometry::CanvasSize;

/// Per-frame values every post stage receives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostUniforms {
    pub resolution: [f32; 2],
    pub frame_index: u64,
    pub pointer: [f32; 2],
    /// Pointer travel since the previous frame, mapped from `[0, width / 2]`
    /// onto `[0, 1]`.
    pub pointer_velocity: f32,
    pub time: f32,
}

impl PostUniforms {
    pub fn new(
        canvas: CanvasSize,
        frame_index: u64,
        pointer: (f32, f32),
        previous_pointer: (f32, f32),
        time_scale: f32,
    ) -> Self {
        Self {
            resolution: [canvas.width, canvas.height],
            frame_index,
            pointer: [pointer.0, pointer.1],
            pointer_velocity: pointer_velocity(previous_pointer, pointer, canvas.width),
            time: frame_index as f32 * time_scale,
        }
    }
}

pub fn pointer_velocity(previous: (f32, f32), current: (f32, f32), width: f32) -> f32 {
    let half_width = width / 2.0;
    if half_width <= 0.0 {
        return 0.0;
    }
    let distance = (current.0 - previous.0).hypot(current.1 - previous.1);
    (distance / half_width).clamp(0.0, 1.0)
}

pub trait PostProcess {
    fn label(&self) -> &str;

    fn apply(&mut self, input: &Pixmap, uniforms: &PostUniforms) -> Result<Pixmap>;
}

/// Configured post stage of a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostEffect {
    Passthrough,
    ChannelDisplacement {
        #[serde(default = "default_luma_threshold")]
        luma_threshold: u8,
        /// Offset budget with a still pointer, in pixels.
        #[serde(default = "default_base_offset")]
        base_offset: usize,
        /// Extra offset at full pointer velocity, in pixels.
        #[serde(default = "default_velocity_offset")]
        velocity_offset: usize,
    },
}

fn default_luma_threshold() -> u8 {
    24
}

fn default_base_offset() -> usize {
    2
}

fn default_velocity_offset() -> usize {
    18
}

impl Default for PostEffect {
    fn default() -> Self {
        Self::ChannelDisplacement {
            luma_threshold: default_luma_threshold(),
            base_offset: default_base_offset(),
            velocity_offset: default_velocity_offset(),
        }
    }
}

pub fn build_post_stage(effect: &PostEffect) -> Box<dyn PostProcess> {
    match *effect {
        PostEffect::Passthrough => Box::new(Passthrough),
        PostEffect::ChannelDisplacement {
            luma_threshold,
            base_offset,
            velocity_offset,
        } => Box::new(DisplacementPass {
            luma_threshold,
            base_offset,
            velocity_offset,
        }),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PostProcess for Passthrough {
    fn label(&self) -> &str {
        "post-passthrough"
    }

    fn apply(&mut self, input: &Pixmap, _uniforms: &PostUniforms) -> Result<Pixmap> {
        Ok(input.clone())
    }
}

/// RGB split whose strength follows pointer velocity.
#[derive(Debug, Clone, Copy)]
pub struct DisplacementPass {
    pub luma_threshold: u8,
    pub base_offset: usize,
    pub velocity_offset: usize,
}

impl DisplacementPass {
    pub fn max_offset(&self, uniforms: &PostUniforms) -> usize {
        let boost = (uniforms.pointer_velocity * self.velocity_offset as f32).round() as usize;
        self.base_offset + boost
    }
}

impl PostProcess for DisplacementPass {
    fn label(&self) -> &str {
        "post-channel-displacement"
    }

    fn apply(&mut self, input: &Pixmap, uniforms: &PostUniforms) -> Result<Pixmap> {
        let mut output = input.clone();
        let node = ChannelDisplacement {
            seed: uniforms.frame_index,
            luma_threshold: self.luma_threshold,
            max_offset: self.max_offset(uniforms),
        };
        let (width, height) = (output.width() as usize, output.height() as usize);
        node.apply(output.data_mut(), width, height)
            .with_context(|| format!("{} failed", self.label()))?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use tiny_skia::Color;

    use super::*;

    fn uniforms(velocity: f32) -> PostUniforms {
        PostUniforms {
            resolution: [16.0, 16.0],
            frame_index: 3,
            pointer: [0.0, 0.0],
            pointer_velocity: velocity,
            time: 0.0,
        }
    }

    #[test]
    fn pointer_velocity_maps_half_width_to_one() {
        assert_eq!(pointer_velocity((0.0, 0.0), (0.0, 0.0), 100.0), 0.0);
        assert!((pointer_velocity((0.0, 0.0), (25.0, 0.0), 100.0) - 0.5).abs() < 1e-6);
        assert_eq!(pointer_velocity((0.0, 0.0), (300.0, 400.0), 100.0), 1.0);
    }

    #[test]
    fn time_uniform_scales_frame_index() {
        let u = PostUniforms::new(
            CanvasSize::new(100.0, 178.0),
            1_000_000,
            (5.0, 5.0),
            (5.0, 5.0),
            0.000001,
        );
        assert!((u.time - 1.0).abs() < 1e-4);
        assert_eq!(u.pointer_velocity, 0.0);
        assert_eq!(u.resolution, [100.0, 178.0]);
    }

    #[test]
    fn passthrough_returns_identical_pixels() {
        let mut input = Pixmap::new(4, 4).unwrap();
        input.fill(Color::from_rgba8(10, 20, 30, 255));
        let output = Passthrough.apply(&input, &uniforms(0.0)).unwrap();
        assert_eq!(output.data(), input.data());
    }

    #[test]
    fn velocity_widens_displacement() {
        let pass = DisplacementPass {
            luma_threshold: 0,
            base_offset: 2,
            velocity_offset: 18,
        };
        assert_eq!(pass.max_offset(&uniforms(0.0)), 2);
        assert_eq!(pass.max_offset(&uniforms(1.0)), 20);
    }

    #[test]
    fn displacement_keeps_dimensions() {
        let mut input = Pixmap::new(16, 16).unwrap();
        input.fill(Color::from_rgba8(200, 100, 50, 255));
        let mut stage = build_post_stage(&PostEffect::default());
        let output = stage.apply(&input, &uniforms(1.0)).unwrap();
        assert_eq!((output.width(), output.height()), (16, 16));
        assert_eq!(stage.label(), "post-channel-displacement");
    }

    #[test]
    fn effect_parses_from_yaml() {
        let effect: PostEffect = serde_yaml::from_str("kind: passthrough").unwrap();
        assert_eq!(effect, PostEffect::Passthrough);
        let effect: PostEffect =
            serde_yaml::from_str("kind: channel_displacement\nbase_offset: 5").unwrap();
        assert!(matches!(
            effect,
            PostEffect::ChannelDisplacement { base_offset: 5, luma_threshold: 24, .. }
        ));
    }
}
