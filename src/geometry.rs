use serde::Serialize;

/// Portrait height-to-width ratio shared by every page canvas and scaled rect.
pub const ASPECT_RATIO: f32 = 1.78;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Canvas derived from a container width using the portrait aspect ratio.
    pub fn from_width(width: f32) -> Self {
        Self::new(width, width * ASPECT_RATIO)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Integer pixel dimensions for allocating buffers (at least 1x1).
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Axis-aligned placement zone. `xmax`/`ymax` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl Region {
    pub fn from_rect(rect: ScaledRect) -> Self {
        Self {
            xmin: rect.x,
            xmax: rect.x + rect.w,
            ymin: rect.y,
            ymax: rect.y + rect.h,
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn contains(&self, point: Point) -> bool {
        let x = point.x as f32;
        let y = point.y as f32;
        x >= self.xmin && x < self.xmax && y >= self.ymin && y < self.ymax
    }

    /// True when the open interiors of both regions overlap.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.xmin < other.xmax
            && other.xmin < self.xmax
            && self.ymin < other.ymax
            && other.ymin < self.ymax
    }
}

/// Canvas-space rectangle given by its top-left corner and extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ScaledRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle of the given size centered on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }
}
