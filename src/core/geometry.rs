use serde::{Deserialize, Serialize};

/// A pixel coordinate as reported by the annotation service. The service drops
/// zero-valued coordinates from its JSON, hence the defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The four corners of a detected text region, in the service's order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingPoly {
    pub vertices: [Vertex; 4],
}

impl BoundingPoly {
    pub fn new(vertices: [Vertex; 4]) -> Self {
        Self { vertices }
    }

    pub fn bbox(&self) -> BBox {
        let first = self.vertices[0];
        self.vertices[1..].iter().fold(
            BBox::new(first.x, first.y, first.x, first.y),
            |acc, v| acc.union(&BBox::new(v.x, v.y, v.x, v.y)),
        )
    }
}

/// Axis-aligned box in image pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Overlay placement relative to an image, in whole percent of its natural size.
///
/// `gallery.js` performs the same computation in the browser when the natural
/// size was not known at render time, so both must round the same way:
/// halves go up, as `Math.round` does (`-0.5` becomes `0`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl OverlayRect {
    /// Returns `None` for a degenerate image size.
    pub fn from_poly(poly: &BoundingPoly, natural_width: u32, natural_height: u32) -> Option<Self> {
        if natural_width == 0 || natural_height == 0 {
            return None;
        }
        let bbox = poly.bbox();
        let w = natural_width as f64;
        let h = natural_height as f64;
        Some(Self {
            left: percent(bbox.x0, w),
            top: percent(bbox.y0, h),
            width: percent(bbox.width(), w),
            height: percent(bbox.height(), h),
        })
    }

    /// Attribute form read back by the overlay script.
    pub fn to_attr(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.width, self.height)
    }
}

fn percent(value: i32, extent: f64) -> i32 {
    (100.0 * value as f64 / extent + 0.5).floor() as i32
}
