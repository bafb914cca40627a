//! Inpainting mask module
//!
//! A [`MaskSession`] collects the user's free-hand brush strokes into a
//! stroke layer at source-image resolution. When a generation request needs
//! it, the layer is normalized into a strictly binary [`NormalizedMask`]:
//! white where the model may repaint, black where the original photo must be
//! preserved.

mod normalize;

use image::{Rgba, RgbaImage};

pub use normalize::{
    BLACK, DEFAULT_COVERAGE_THRESHOLD, DEFAULT_SATURATION_PASSES, NormalizeOptions,
    NormalizedMask, WHITE, coverage, normalize_stroke_buffer, saturate,
};

/// Colour of painted strokes in the stroke layer
pub const BRUSH_COLOR: [u8; 3] = [255, 0, 0];

/// Opacity of a single paint pass
pub const PAINT_OPACITY: f32 = 0.5;

/// Smallest brush radius, in buffer pixels
const MIN_RADIUS: f32 = 0.5;

/// A pointer position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Brush behaviour for a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeMode {
    /// Adds partially opaque coverage
    #[default]
    Paint,
    /// Clears coverage completely
    Erase,
}

#[derive(Debug, Clone, Copy)]
struct ActiveStroke {
    last: Point,
    radius: f32,
    mode: StrokeMode,
}

/// Editing session owning the stroke layer for one source image
#[derive(Debug, Clone)]
pub struct MaskSession {
    buffer: RgbaImage,
    /// Displayed size of the image, in pointer coordinates
    viewport: (f32, f32),
    stroke: Option<ActiveStroke>,
    suspended: bool,
    touched: bool,
}

impl MaskSession {
    /// Create a session for a source image of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
            viewport: (width as f32, height as f32),
            stroke: None,
            suspended: false,
            touched: false,
        }
    }

    /// Discard everything and start over for a new source image
    pub fn reset(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// The raw stroke layer
    pub fn stroke_buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Size at which the image is currently displayed. Pointer coordinates
    /// are rescaled from this size to the buffer size, per axis.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    /// Suspend drawing while a secondary input panel has focus
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
        if suspended {
            self.stroke = None;
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// True once any stroke segment was rendered since creation or `clear`
    pub fn has_strokes(&self) -> bool {
        self.touched
    }

    /// Map a viewport point into stroke-layer coordinates
    pub fn to_buffer_space(&self, point: Point) -> Point {
        let scale = |buffer: u32, displayed: f32| {
            if displayed > 0.0 && displayed.is_finite() {
                buffer as f32 / displayed
            } else {
                1.0
            }
        };
        Point::new(
            point.x * scale(self.width(), self.viewport.0),
            point.y * scale(self.height(), self.viewport.1),
        )
    }

    /// Start a stroke at a viewport point. Ignored while suspended.
    pub fn begin_stroke(&mut self, point: Point, brush_size: f32, mode: StrokeMode) {
        if self.suspended {
            return;
        }
        self.stroke = Some(ActiveStroke {
            last: self.to_buffer_space(point),
            radius: (brush_size / 2.0).max(MIN_RADIUS),
            mode,
        });
    }

    /// Draw a segment from the previous point to `point`
    pub fn extend_stroke(&mut self, point: Point) {
        let Some(mut stroke) = self.stroke else {
            return;
        };
        let next = self.to_buffer_space(point);
        self.render_segment(stroke.last, next, stroke.radius, stroke.mode);
        stroke.last = next;
        self.stroke = Some(stroke);
    }

    /// Finish the current stroke. Safe to call repeatedly.
    pub fn end_stroke(&mut self) {
        self.stroke = None;
    }

    /// Reset the layer to fully transparent
    pub fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        self.stroke = None;
        self.touched = false;
    }

    /// Binary mask for a generation request, or `None` when the user never
    /// drew anything (whole-image strategy)
    pub fn export_normalized_mask(&self) -> Option<NormalizedMask> {
        self.export_normalized_mask_with(&NormalizeOptions::default())
    }

    pub fn export_normalized_mask_with(
        &self,
        options: &NormalizeOptions,
    ) -> Option<NormalizedMask> {
        if !self.touched {
            return None;
        }
        normalize_stroke_buffer(&self.buffer, options)
    }

    /// Rasterise a round-capped segment. Only pixels inside the segment's
    /// bounding box are visited.
    fn render_segment(&mut self, from: Point, to: Point, radius: f32, mode: StrokeMode) {
        let (width, height) = self.buffer.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
        let max_x = (from.x.max(to.x) + radius).ceil().min(width as f32 - 1.0);
        let max_y = (from.y.max(to.y) + radius).ceil().min(height as f32 - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let r2 = radius * radius;
        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_sq_to_segment(center, from, to) > r2 {
                    continue;
                }
                let pixel = self.buffer.get_pixel_mut(x, y);
                match mode {
                    StrokeMode::Paint => *pixel = paint_over(*pixel),
                    StrokeMode::Erase => *pixel = Rgba([0, 0, 0, 0]),
                }
            }
        }
        self.touched = true;
    }
}

/// Source-over of one brush pass onto an existing stroke pixel
fn paint_over(dst: Rgba<u8>) -> Rgba<u8> {
    let Rgba([dr, dg, db, da]) = dst;
    let sa = PAINT_OPACITY;
    let da = da as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let blend = |s: u8, d: u8| {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(BRUSH_COLOR[0], dr),
        blend(BRUSH_COLOR[1], dg),
        blend(BRUSH_COLOR[2], db),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > f32::EPSILON {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    (p.x - cx) * (p.x - cx) + (p.y - cy) * (p.y - cy)
}
