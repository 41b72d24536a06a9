use rand::{Rng, RngCore};
use serde::Serialize;
use tiny_skia::Color;

use crate::area::Area;
use crate::canvas::{isolated, Canvas};
use crate::geometry::{CanvasSize, Point, ScaledRect, Size};

const BLACKOUT_RGB: u8 = 0x12;

pub fn blackout_fill() -> Color {
    Color::from_rgba8(BLACKOUT_RGB, BLACKOUT_RGB, BLACKOUT_RGB, 0xff)
}

/// Common lifecycle of every glitch block.
pub trait Block {
    /// Draw a fresh random layout. Repeatable.
    fn initialize(&mut self, rng: &mut dyn RngCore);

    fn render(&self, canvas: &mut dyn Canvas);

    /// Recompute areas and size bounds for `canvas`, then re-initialize.
    fn resize(&mut self, canvas: CanvasSize, rng: &mut dyn RngCore);
}

/// Inclusive pixel bounds derived from a pair of width ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

impl SizeRange {
    /// Bounds are sorted, so the ratios may come in either order.
    pub fn from_ratios(width: f32, a: f32, b: f32) -> Self {
        let a = (width * a).round().max(0.0) as u32;
        let b = (width * b).round().max(0.0) as u32;
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn random(&self, rng: &mut dyn RngCore) -> u32 {
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Opaque rectangle placed inside a render area. Used for blackouts.
#[derive(Debug, Clone)]
pub struct GlitchBlock {
    render_area: Area,
    min_size_ratio: f32,
    max_size_ratio: f32,
    size_range: SizeRange,
    pub(crate) position: Point,
    pub(crate) size: Size,
}

impl GlitchBlock {
    pub fn new(render_area: Area, min_size_ratio: f32, max_size_ratio: f32) -> Self {
        let size_range =
            SizeRange::from_ratios(render_area.canvas().width, min_size_ratio, max_size_ratio);
        Self {
            render_area,
            min_size_ratio,
            max_size_ratio,
            size_range,
            position: Point::default(),
            size: Size::default(),
        }
    }

    /// Builder-style [`Block::initialize`].
    pub fn initialized(mut self, rng: &mut dyn RngCore) -> Self {
        self.initialize(rng);
        self
    }

    pub fn render_area(&self) -> &Area {
        &self.render_area
    }

    pub fn size_range(&self) -> SizeRange {
        self.size_range
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Canvas rectangle centered on the block position.
    pub fn bounds(&self) -> ScaledRect {
        ScaledRect::centered(
            self.position.x as f32,
            self.position.y as f32,
            self.size.w as f32,
            self.size.h as f32,
        )
    }

    pub(crate) fn random_size(&self, rng: &mut dyn RngCore) -> u32 {
        self.size_range.random(rng)
    }

    pub(crate) fn random_position(&self, rng: &mut dyn RngCore) -> Point {
        self.render_area.random_point(rng)
    }

    pub(crate) fn random_render_size(&self, rng: &mut dyn RngCore) -> Size {
        Size::new(self.random_size(rng), self.random_size(rng))
    }

    pub(crate) fn rescale(&mut self, canvas: CanvasSize) {
        self.render_area.resize(canvas);
        self.size_range =
            SizeRange::from_ratios(canvas.width, self.min_size_ratio, self.max_size_ratio);
    }
}

impl Block for GlitchBlock {
    fn initialize(&mut self, rng: &mut dyn RngCore) {
        self.position = self.random_position(rng);
        self.size = self.random_render_size(rng);
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        let bounds = self.bounds();
        isolated(canvas, |c| {
            c.set_fill(blackout_fill());
            c.fill_rect(bounds);
        });
    }

    fn resize(&mut self, canvas: CanvasSize, rng: &mut dyn RngCore) {
        self.rescale(canvas);
        self.initialize(rng);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::area::AreaLimits;
    use crate::canvas::PixmapCanvas;

    fn blackout(width: f32) -> GlitchBlock {
        let canvas = CanvasSize::from_width(width);
        let area = Area::new(AreaLimits::frame(0.75, 0.55), canvas).unwrap();
        GlitchBlock::new(area, 0.1, 0.24)
    }

    #[test]
    fn size_range_sorts_swapped_ratios() {
        let range = SizeRange::from_ratios(1000.0, 0.06, 0.03);
        assert_eq!(range, SizeRange { min: 30, max: 60 });
    }

    #[test]
    fn initialize_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut block = blackout(1000.0);
        assert_eq!(block.size_range(), SizeRange { min: 100, max: 240 });

        for _ in 0..500 {
            block.initialize(&mut rng);
            assert!(block.size_range().contains(block.size().w));
            assert!(block.size_range().contains(block.size().h));
            assert!(block.render_area().contains(block.position()));
        }
    }

    #[test]
    fn resize_rescales_and_rerolls() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut block = blackout(1000.0).initialized(&mut rng);

        block.resize(CanvasSize::from_width(500.0), &mut rng);
        assert_eq!(block.size_range(), SizeRange { min: 50, max: 120 });
        assert!(block.size_range().contains(block.size().w));
        assert!(block.render_area().contains(block.position()));
    }

    #[test]
    fn render_fills_block_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut block = blackout(200.0).initialized(&mut rng);
        block.position = Point::new(100, 150);
        block.size = Size::new(20, 10);

        let mut canvas = PixmapCanvas::new(200, 356).unwrap();
        block.render(&mut canvas);

        let inside = canvas.pixmap().pixel(100, 150).unwrap();
        assert_eq!((inside.red(), inside.alpha()), (0x12, 255));
        assert_eq!(canvas.pixmap().pixel(100, 160).unwrap().alpha(), 0);
        assert_eq!(canvas.depth(), 0);
    }
}
