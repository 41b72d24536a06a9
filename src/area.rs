//! Randomized point zones inside a canvas.
//!
//! An [`Area`] is a centered rectangle scaled from the canvas width. With an
//! inner limit it becomes a picture frame: four bands around an inner
//! keep-out rectangle, so sampled or rendered content avoids the middle of
//! the composition.

use anyhow::{bail, Result};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::geometry::{CanvasSize, Point, Region, ScaledRect, ASPECT_RATIO};

/// Scale ratios of an [`Area`], as fractions of the canvas width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaLimits {
    pub outer: f32,
    #[serde(default)]
    pub inner: Option<f32>,
}

impl AreaLimits {
    pub const fn centered(outer: f32) -> Self {
        Self { outer, inner: None }
    }

    pub const fn frame(outer: f32, inner: f32) -> Self {
        Self {
            outer,
            inner: Some(inner),
        }
    }

    /// Rejects ratios that would produce inverted or empty regions.
    pub fn validate(&self) -> Result<()> {
        if !self.outer.is_finite() || self.outer <= 0.0 {
            bail!("area outer limit must be > 0, got {}", self.outer);
        }

        if let Some(inner) = self.inner {
            if !inner.is_finite() || inner <= 0.0 {
                bail!("area inner limit must be > 0, got {inner}");
            }
            if inner >= self.outer {
                bail!(
                    "area inner limit ({inner}) must be smaller than outer limit ({})",
                    self.outer
                );
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Area {
    limits: AreaLimits,
    canvas: CanvasSize,
    regions: Vec<Region>,
}

impl Area {
    pub fn new(limits: AreaLimits, canvas: CanvasSize) -> Result<Self> {
        limits.validate()?;
        let mut area = Self {
            limits,
            canvas,
            regions: Vec::with_capacity(4),
        };
        area.compute_regions(canvas);
        if !area.regions.iter().any(has_integer_point) {
            bail!(
                "area {:?} has no whole-pixel point on a {}x{} canvas",
                limits,
                canvas.width,
                canvas.height
            );
        }
        Ok(area)
    }

    pub fn limits(&self) -> AreaLimits {
        self.limits
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Recompute every region for a new canvas size.
    pub fn resize(&mut self, canvas: CanvasSize) {
        self.compute_regions(canvas);
    }

    pub fn compute_regions(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        self.regions.clear();

        let outer = scaled_rect(canvas, self.limits.outer);
        let Some(inner_limit) = self.limits.inner else {
            self.regions.push(Region::from_rect(outer));
            return;
        };

        let inner = scaled_rect(canvas, inner_limit);
        let outer_right = outer.x + outer.w;
        let outer_bottom = outer.y + outer.h;
        let inner_right = inner.x + inner.w;
        let inner_bottom = inner.y + inner.h;

        // top, bottom, left, right
        self.regions.extend([
            Region {
                xmin: outer.x,
                xmax: outer_right,
                ymin: outer.y,
                ymax: inner.y,
            },
            Region {
                xmin: outer.x,
                xmax: outer_right,
                ymin: inner_bottom,
                ymax: outer_bottom,
            },
            Region {
                xmin: outer.x,
                xmax: inner.x,
                ymin: inner.y,
                ymax: inner_bottom,
            },
            Region {
                xmin: inner_right,
                xmax: outer_right,
                ymin: inner.y,
                ymax: inner_bottom,
            },
        ]);
    }

    /// Uniformly pick a region, then an integer point inside it.
    ///
    /// Bands thinner than a pixel hold no integer point and are skipped. If a
    /// resize leaves no region with one, the canvas center is used.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Point {
        let viable = self
            .regions
            .iter()
            .filter(|region| has_integer_point(region))
            .collect::<Vec<_>>();
        let region = match viable.len() {
            0 => {
                let (cx, cy) = self.canvas.center();
                return Point::new(cx.round() as i32, cy.round() as i32);
            }
            1 => viable[0],
            n => viable[rng.random_range(0..n)],
        };

        Point::new(
            random_coordinate(rng, region.xmin, region.xmax),
            random_coordinate(rng, region.ymin, region.ymax),
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        self.regions.iter().any(|region| region.contains(point))
    }
}

/// Centered rectangle `ratio` times the canvas width wide, with the portrait
/// aspect ratio applied to its height.
pub fn scaled_rect(canvas: CanvasSize, ratio: f32) -> ScaledRect {
    let margin = (1.0 - ratio) / 2.0;
    let w = canvas.width * ratio;
    let h = w * ASPECT_RATIO;
    let x = canvas.width * margin;
    let y = (canvas.height - h) / 2.0;
    ScaledRect::new(x, y, w, h)
}

fn integer_span(min: f32, max: f32) -> Option<(i32, i32)> {
    let low = min.ceil() as i32;
    let high = max.ceil() as i32 - 1;
    (low <= high).then_some((low, high))
}

fn has_integer_point(region: &Region) -> bool {
    integer_span(region.xmin, region.xmax).is_some()
        && integer_span(region.ymin, region.ymax).is_some()
}

fn random_coordinate(rng: &mut dyn RngCore, min: f32, max: f32) -> i32 {
    match integer_span(min, max) {
        Some((low, high)) => rng.random_range(low..=high),
        None => min.ceil() as i32,
    }
}
