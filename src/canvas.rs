//! Off-screen drawing buffer that glitch blocks compose into.

use anyhow::{anyhow, Result};
use tiny_skia::{Color, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform};

use crate::geometry::ScaledRect;

/// Drawing primitives the block renderers rely on.
///
/// State set through `set_fill`/`set_smoothing` persists until the matching
/// `pop`; renderers bracket their calls with [`isolated`].
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);
    fn clear(&mut self);
    fn push(&mut self);
    fn pop(&mut self);
    fn set_fill(&mut self, color: Color);
    fn set_smoothing(&mut self, smooth: bool);
    fn fill_rect(&mut self, rect: ScaledRect);
    fn draw_image(&mut self, image: &Pixmap, rect: ScaledRect);
}

/// Run `draw` between a push and pop so state changes never leak.
pub fn isolated(canvas: &mut dyn Canvas, draw: impl FnOnce(&mut dyn Canvas)) {
    canvas.push();
    draw(canvas);
    canvas.pop();
}

#[derive(Debug, Clone, Copy)]
struct DrawState {
    fill: Color,
    smoothing: bool,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            smoothing: true,
        }
    }
}

/// [`Canvas`] backed by a tiny-skia pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl PixmapCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("failed to allocate canvas pixmap {}x{}", width, height))?;
        Ok(Self {
            pixmap,
            state: DrawState::default(),
            stack: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Replace the buffer with a fresh transparent one of the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        *self = Self::new(width, height)?;
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Canvas for PixmapCanvas {
    fn dimensions(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn push(&mut self) {
        self.stack.push(self.state);
    }

    fn pop(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_fill(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_smoothing(&mut self, smooth: bool) {
        self.state.smoothing = smooth;
    }

    fn fill_rect(&mut self, rect: ScaledRect) {
        let Some(rect) = Rect::from_xywh(rect.x, rect.y, rect.w, rect.h) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(self.state.fill);
        paint.anti_alias = false;
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn draw_image(&mut self, image: &Pixmap, rect: ScaledRect) {
        if rect.is_empty() {
            return;
        }

        let scale_x = rect.w / image.width() as f32;
        let scale_y = rect.h / image.height() as f32;
        let paint = PixmapPaint {
            quality: if self.state.smoothing {
                FilterQuality::Bilinear
            } else {
                FilterQuality::Nearest
            },
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            Transform::from_row(scale_x, 0.0, 0.0, scale_y, rect.x, rect.y),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(canvas: &PixmapCanvas, x: u32, y: u32) -> [u8; 4] {
        let px = canvas.pixmap().pixel(x, y).unwrap();
        [px.red(), px.green(), px.blue(), px.alpha()]
    }

    #[test]
    fn fill_rect_paints_opaque_pixels() {
        let mut canvas = PixmapCanvas::new(8, 8).unwrap();
        canvas.set_fill(Color::from_rgba8(0x12, 0x12, 0x12, 255));
        canvas.fill_rect(ScaledRect::new(2.0, 2.0, 4.0, 4.0));

        assert_eq!(pixel(&canvas, 3, 3), [0x12, 0x12, 0x12, 255]);
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn isolated_restores_state() {
        let mut canvas = PixmapCanvas::new(4, 4).unwrap();
        canvas.set_fill(Color::from_rgba8(255, 0, 0, 255));
        isolated(&mut canvas, |c| {
            c.set_fill(Color::from_rgba8(0, 0, 255, 255));
            c.fill_rect(ScaledRect::new(0.0, 0.0, 2.0, 4.0));
        });
        assert_eq!(canvas.depth(), 0);

        canvas.fill_rect(ScaledRect::new(2.0, 0.0, 2.0, 4.0));
        assert_eq!(pixel(&canvas, 0, 0), [0, 0, 255, 255]);
        assert_eq!(pixel(&canvas, 3, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn nearest_filter_keeps_hard_edges() {
        let mut source = Pixmap::new(2, 1).unwrap();
        source.fill_rect(
            Rect::from_xywh(0.0, 0.0, 1.0, 1.0).unwrap(),
            &{
                let mut paint = Paint::default();
                paint.set_color(Color::WHITE);
                paint
            },
            Transform::identity(),
            None,
        );

        let mut canvas = PixmapCanvas::new(8, 1).unwrap();
        canvas.set_smoothing(false);
        canvas.draw_image(&source, ScaledRect::new(0.0, 0.0, 8.0, 1.0));

        let values = (0..8)
            .map(|x| pixel(&canvas, x, 0)[3])
            .collect::<Vec<_>>();
        assert_eq!(values, vec![255, 255, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn clear_resets_to_transparent() {
        let mut canvas = PixmapCanvas::new(2, 2).unwrap();
        canvas.fill_rect(ScaledRect::new(0.0, 0.0, 2.0, 2.0));
        canvas.clear();
        assert_eq!(pixel(&canvas, 1, 1), [0, 0, 0, 0]);
    }
}
