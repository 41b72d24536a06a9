//! Image-sampling glitch blocks.
//!
//! A [`GlitchSample`] wraps a [`GlitchBlock`] and carries a sub-image cut out
//! of a source. Where the sample is read from (`sample_area`) and where it is
//! drawn (`render_area`) are independent. The [`SamplePolicy`] decides the
//! sample dimensions: plain samples, thin strips or chunky fragments.

use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

use crate::area::Area;
use crate::block::{Block, GlitchBlock, SizeRange};
use crate::canvas::{isolated, Canvas};
use crate::geometry::{CanvasSize, Point, Size, ASPECT_RATIO};
use crate::source::SourceImage;

pub const MIN_PERTURB_OFFSET: f32 = 15.0;
pub const MAX_PERTURB_OFFSET: f32 = 45.0;
pub const RESAMPLE_PROBABILITY: f64 = 0.4;

/// Strip thickness along the thin axis, `[min, max)` pixels.
const STRIP_THICKNESS: (u32, u32) = (5, 10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplePolicy {
    /// Block-sized sample, height stretched by the aspect ratio.
    Plain,
    /// One axis 5-9 px thin, rendered at native length along the other.
    Strip,
    /// Independent width/height from the sample ratios, height stretched.
    Fragment {
        min_sample_ratio: f32,
        max_sample_ratio: f32,
    },
}

impl SamplePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Strip => "strip",
            Self::Fragment { .. } => "fragment",
        }
    }

    /// Bounds for fragment sample dimensions; block bounds otherwise.
    fn sample_range(&self, width: f32, block_range: SizeRange) -> SizeRange {
        match *self {
            Self::Fragment {
                min_sample_ratio,
                max_sample_ratio,
            } => SizeRange::from_ratios(width, min_sample_ratio, max_sample_ratio),
            Self::Plain | Self::Strip => block_range,
        }
    }

    fn sample_size(&self, rng: &mut dyn RngCore, block: &GlitchBlock, sample: SizeRange) -> Size {
        match self {
            Self::Plain => Size::new(
                block.random_size(rng),
                stretch(block.random_size(rng)),
            ),
            Self::Strip => {
                let thin = rng.random_range(STRIP_THICKNESS.0..STRIP_THICKNESS.1);
                if rng.random_bool(0.5) {
                    Size::new(thin, block.random_size(rng))
                } else {
                    Size::new(block.random_size(rng), thin)
                }
            }
            Self::Fragment { .. } => Size::new(sample.random(rng), stretch(sample.random(rng))),
        }
    }

    fn render_size(&self, rng: &mut dyn RngCore, block: &GlitchBlock, sample: Size) -> Size {
        match self {
            Self::Strip => Size::new(
                if sample.w > sample.h {
                    sample.w
                } else {
                    block.random_size(rng)
                },
                if sample.h > sample.w {
                    sample.h
                } else {
                    block.random_size(rng)
                },
            ),
            Self::Plain | Self::Fragment { .. } => block.random_render_size(rng),
        }
    }
}

fn stretch(value: u32) -> u32 {
    (value as f32 * ASPECT_RATIO) as u32
}

/// Blocks that carry pixel content from a source image.
pub trait Sample: Block {
    /// Cut a new sample from the source. The render box is untouched.
    fn draw_sample(&mut self, rng: &mut dyn RngCore);

    /// Jitter the position around its anchor and sometimes re-sample.
    fn perturb(&mut self, rng: &mut dyn RngCore);
}

#[derive(Debug, Clone)]
pub struct GlitchSample {
    block: GlitchBlock,
    policy: SamplePolicy,
    source: Arc<SourceImage>,
    sample_area: Area,
    sample_range: SizeRange,
    original_pos: Point,
    sample_origin: Point,
    sample_size: Size,
    sample: Option<Pixmap>,
}

impl GlitchSample {
    pub fn new(
        block: GlitchBlock,
        source: Arc<SourceImage>,
        sample_area: Area,
        policy: SamplePolicy,
    ) -> Self {
        let width = block.render_area().canvas().width;
        let sample_range = policy.sample_range(width, block.size_range());
        Self {
            block,
            policy,
            source,
            sample_area,
            sample_range,
            original_pos: Point::default(),
            sample_origin: Point::default(),
            sample_size: Size::default(),
            sample: None,
        }
    }

    /// Builder-style [`Block::initialize`].
    pub fn initialized(mut self, rng: &mut dyn RngCore) -> Self {
        self.initialize(rng);
        self
    }

    pub fn block(&self) -> &GlitchBlock {
        &self.block
    }

    pub fn policy(&self) -> SamplePolicy {
        self.policy
    }

    pub fn sample_area(&self) -> &Area {
        &self.sample_area
    }

    pub fn sample_range(&self) -> SizeRange {
        self.sample_range
    }

    pub fn position(&self) -> Point {
        self.block.position()
    }

    pub fn size(&self) -> Size {
        self.block.size()
    }

    pub fn original_pos(&self) -> Point {
        self.original_pos
    }

    /// Where in the source the current sample was read from.
    pub fn sample_origin(&self) -> Point {
        self.sample_origin
    }

    /// Requested dimensions of the current sample.
    pub fn sample_size(&self) -> Size {
        self.sample_size
    }

    pub fn sample(&self) -> Option<&Pixmap> {
        self.sample.as_ref()
    }
}

impl Block for GlitchSample {
    fn initialize(&mut self, rng: &mut dyn RngCore) {
        self.draw_sample(rng);
        let position = self.block.random_position(rng);
        self.block.position = position;
        self.original_pos = position;
        self.block.size = self.policy.render_size(rng, &self.block, self.sample_size);
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        let Some(sample) = &self.sample else {
            return;
        };
        let bounds = self.block.bounds();
        isolated(canvas, |c| {
            c.set_smoothing(false);
            c.draw_image(sample, bounds);
        });
    }

    fn resize(&mut self, canvas: CanvasSize, rng: &mut dyn RngCore) {
        self.block.rescale(canvas);
        self.sample_range = self
            .policy
            .sample_range(canvas.width, self.block.size_range());
        self.initialize(rng);
    }
}

impl Sample for GlitchSample {
    fn draw_sample(&mut self, rng: &mut dyn RngCore) {
        self.sample_origin = self.sample_area.random_point(rng);
        self.sample_size = self
            .policy
            .sample_size(rng, &self.block, self.sample_range);
        self.sample = self.source.extract(self.sample_origin, self.sample_size);
    }

    fn perturb(&mut self, rng: &mut dyn RngCore) {
        let dx = jitter(rng);
        let dy = jitter(rng);
        self.block.position = Point::new(self.original_pos.x + dx, self.original_pos.y + dy);
        if rng.random_bool(RESAMPLE_PROBABILITY) {
            self.draw_sample(rng);
        }
    }
}

/// Offset in `[15, 45]` px with a sign from {-1, 0, 1}.
fn jitter(rng: &mut dyn RngCore) -> i32 {
    let magnitude = rng.random_range(MIN_PERTURB_OFFSET..MAX_PERTURB_OFFSET);
    let sign = rng.random_range(-1..=1);
    (magnitude * sign as f32).round() as i32
}
