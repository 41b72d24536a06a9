use std::sync::Arc;

use crate::canvas::{isolated, Canvas};
use crate::geometry::{CanvasSize, ScaledRect, ASPECT_RATIO};
use crate::source::SourceImage;

/// Backdrop drawn centered beneath every glitch block.
#[derive(Debug, Clone)]
pub struct BaseImage {
    image: Arc<SourceImage>,
    scale: f32,
    center: (f32, f32),
    width: f32,
    height: f32,
}

impl BaseImage {
    pub fn new(image: Arc<SourceImage>, scale: f32, canvas: CanvasSize) -> Self {
        let mut base = Self {
            image,
            scale,
            center: (0.0, 0.0),
            width: 0.0,
            height: 0.0,
        };
        base.resize(canvas);
        base
    }

    pub fn resize(&mut self, canvas: CanvasSize) {
        self.center = canvas.center();
        self.width = canvas.width * self.scale;
        self.height = canvas.width * ASPECT_RATIO * self.scale;
    }

    pub fn bounds(&self) -> ScaledRect {
        ScaledRect::centered(self.center.0, self.center.1, self.width, self.height)
    }

    pub fn render(&self, canvas: &mut dyn Canvas) {
        let bounds = self.bounds();
        isolated(canvas, |c| {
            c.set_smoothing(true);
            c.draw_image(self.image.pixmap(), bounds);
        });
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::canvas::PixmapCanvas;

    fn base(scale: f32, width: f32) -> BaseImage {
        let image = RgbaImage::from_pixel(10, 18, Rgba([200, 10, 10, 255]));
        let source = Arc::new(SourceImage::from_rgba(&image).unwrap());
        BaseImage::new(source, scale, CanvasSize::from_width(width))
    }

    #[test]
    fn bounds_are_centered_and_scaled() {
        let base = base(0.9, 1000.0);
        let bounds = base.bounds();
        assert!((bounds.w - 900.0).abs() < 1e-2);
        assert!((bounds.h - 1602.0).abs() < 1e-2);
        assert!((bounds.x - 50.0).abs() < 1e-2);
        assert!((bounds.y - 89.0).abs() < 1e-2);
    }

    #[test]
    fn resize_follows_canvas_width() {
        let mut base = base(0.5, 1000.0);
        base.resize(CanvasSize::from_width(400.0));
        let bounds = base.bounds();
        assert!((bounds.w - 200.0).abs() < 1e-2);
        assert!((bounds.h - 356.0).abs() < 1e-2);
    }

    #[test]
    fn render_leaves_margin_transparent() {
        let base = base(0.5, 100.0);
        let mut canvas = PixmapCanvas::new(100, 178).unwrap();
        base.render(&mut canvas);

        assert_eq!(canvas.pixmap().pixel(50, 89).unwrap().alpha(), 255);
        assert_eq!(canvas.pixmap().pixel(2, 2).unwrap().alpha(), 0);
    }
}
