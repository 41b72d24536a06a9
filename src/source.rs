use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{ImageReader, RgbaImage};
use tiny_skia::{ColorU8, Pixmap};

use crate::geometry::{CanvasSize, Point, Size};

/// A decoded, premultiplied pixel buffer that blocks sample from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixmap: Pixmap,
}

impl SourceImage {
    pub fn open(path: &Path) -> Result<Self> {
        let image = ImageReader::open(path)
            .with_context(|| format!("failed opening {}", path.display()))?
            .decode()
            .with_context(|| format!("failed decoding {}", path.display()))?
            .to_rgba8();
        Self::from_rgba(&image)
            .with_context(|| format!("failed converting {}", path.display()))
    }

    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid image dimensions {}x{}", width, height))?;

        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn dimensions(&self) -> CanvasSize {
        CanvasSize::new(self.width() as f32, self.height() as f32)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Copy the `size` rectangle at `origin` into a new pixmap.
    ///
    /// Pixels outside the source come back transparent. Returns `None` for an
    /// empty rectangle.
    pub fn extract(&self, origin: Point, size: Size) -> Option<Pixmap> {
        let mut out = Pixmap::new(size.w, size.h)?;

        let src_width = i64::from(self.width());
        let src_height = i64::from(self.height());
        let out_width = i64::from(size.w);
        let x0 = i64::from(origin.x).max(0);
        let x1 = (i64::from(origin.x) + out_width).min(src_width);
        if x0 >= x1 {
            return Some(out);
        }
        let span = (x1 - x0) as usize;

        let src = self.pixmap.pixels();
        let dst = out.pixels_mut();
        for row in 0..i64::from(size.h) {
            let src_y = i64::from(origin.y) + row;
            if src_y < 0 || src_y >= src_height {
                continue;
            }
            let src_start = (src_y * src_width + x0) as usize;
            let dst_start = (row * out_width + (x0 - i64::from(origin.x))) as usize;
            dst[dst_start..dst_start + span].copy_from_slice(&src[src_start..src_start + span]);
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn gradient(width: u32, height: u32) -> SourceImage {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 0, 255])
        });
        SourceImage::from_rgba(&image).unwrap()
    }

    #[test]
    fn extract_copies_inner_pixels() {
        let source = gradient(10, 10);
        let sample = source.extract(Point::new(2, 3), Size::new(4, 2)).unwrap();
        assert_eq!(sample.width(), 4);
        assert_eq!(sample.height(), 2);

        let px = sample.pixel(1, 1).unwrap();
        assert_eq!((px.red(), px.green(), px.alpha()), (30, 40, 255));
    }

    #[test]
    fn extract_past_bounds_is_transparent() {
        let source = gradient(4, 4);
        let sample = source.extract(Point::new(2, -1), Size::new(4, 3)).unwrap();

        assert_eq!(sample.pixel(0, 0).unwrap().alpha(), 0);
        assert_eq!(sample.pixel(3, 1).unwrap().alpha(), 0);
        let inside = sample.pixel(1, 1).unwrap();
        assert_eq!((inside.red(), inside.green(), inside.alpha()), (30, 0, 255));
    }

    #[test]
    fn extract_fully_outside_is_blank() {
        let source = gradient(4, 4);
        let sample = source.extract(Point::new(-50, 80), Size::new(6, 6)).unwrap();
        assert!(sample.pixels().iter().all(|px| px.alpha() == 0));
    }

    #[test]
    fn extract_empty_rect_is_none() {
        let source = gradient(4, 4);
        assert!(source.extract(Point::new(0, 0), Size::new(0, 3)).is_none());
    }
}
