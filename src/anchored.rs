//! Fixed images pinned to a canvas edge or center.
//!
//! Used by the simpler pages, which only place one or two illustrations and
//! let the post-process stage do the glitching.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::canvas::{isolated, Canvas};
use crate::geometry::{CanvasSize, ScaledRect};
use crate::source::SourceImage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAnchor {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAnchor {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorLayout {
    #[serde(default)]
    pub xpos: HorizontalAnchor,
    #[serde(default)]
    pub ypos: VerticalAnchor,
    #[serde(default)]
    pub xmargin: f32,
    #[serde(default)]
    pub ymargin: f32,
    #[serde(default = "default_ratio")]
    pub ratio: f32,
    #[serde(default = "default_min_width")]
    pub min_width: f32,
    #[serde(default = "default_max_width")]
    pub max_width: f32,
}

fn default_ratio() -> f32 {
    1.0
}

fn default_min_width() -> f32 {
    400.0
}

fn default_max_width() -> f32 {
    800.0
}

impl Default for AnchorLayout {
    fn default() -> Self {
        Self {
            xpos: HorizontalAnchor::default(),
            ypos: VerticalAnchor::default(),
            xmargin: 0.0,
            ymargin: 0.0,
            ratio: default_ratio(),
            min_width: default_min_width(),
            max_width: default_max_width(),
        }
    }
}

impl AnchorLayout {
    pub fn validate(&self) -> Result<()> {
        if !(self.ratio.is_finite() && self.ratio > 0.0) {
            bail!("anchored image ratio must be > 0, got {}", self.ratio);
        }
        if self.min_width < 0.0 || self.max_width < self.min_width {
            bail!(
                "anchored image width bounds are inverted: min {} > max {}",
                self.min_width,
                self.max_width
            );
        }
        Ok(())
    }

    /// Destination rectangle for an `image_width` x `image_height` image.
    ///
    /// Width is `canvas.width * ratio` clamped to the width bounds; height
    /// keeps the image's own aspect ratio.
    pub fn place(&self, canvas: CanvasSize, image_width: u32, image_height: u32) -> ScaledRect {
        let w = canvas.width * self.ratio;
        let rw = if w < self.min_width {
            self.min_width
        } else if w > self.max_width {
            self.max_width
        } else {
            w
        };
        let rh = rw * (image_height as f32 / image_width.max(1) as f32);

        let x = match self.xpos {
            HorizontalAnchor::Left => self.xmargin,
            HorizontalAnchor::Right => canvas.width - rw - self.xmargin,
            HorizontalAnchor::Center => (canvas.width - rw) / 2.0,
        };
        let y = match self.ypos {
            VerticalAnchor::Top => self.ymargin,
            VerticalAnchor::Bottom => canvas.height - rh - self.ymargin,
            VerticalAnchor::Center => (canvas.height - rh) / 2.0,
        };

        ScaledRect::new(x, y, rw, rh)
    }
}

/// Page entry for an anchored image: where to load it from and how to place it.
#[derive(Debug, Clone, Deserialize)]
pub struct AnchoredImageConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub layout: AnchorLayout,
}

#[derive(Debug, Clone)]
pub struct AnchoredImage {
    image: Arc<SourceImage>,
    layout: AnchorLayout,
}

impl AnchoredImage {
    pub fn new(image: Arc<SourceImage>, layout: AnchorLayout) -> Self {
        Self { image, layout }
    }

    pub fn bounds(&self, canvas: CanvasSize) -> ScaledRect {
        self.layout
            .place(canvas, self.image.width(), self.image.height())
    }

    pub fn render(&self, canvas: &mut dyn Canvas, size: CanvasSize) {
        let bounds = self.bounds(size);
        isolated(canvas, |c| {
            c.set_smoothing(true);
            c.draw_image(self.image.pixmap(), bounds);
        });
    }
}
