//! Binary mask normalization
//!
//! Turns a stroke layer with arbitrary (overlapping, partial) opacity into
//! a mask with exactly two pixel values: opaque white where the model may
//! edit, opaque black where the original must be kept.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::codec;
use crate::error::Result;

/// How many times the stroke layer is composited onto itself
pub const DEFAULT_SATURATION_PASSES: u32 = 3;

/// Saturated coverage at or above this value becomes white
pub const DEFAULT_COVERAGE_THRESHOLD: u8 = 128;

/// Pixel value marking an editable pixel
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pixel value marking a protected pixel
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Options for [`normalize_stroke_buffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Self-composite repetitions used to saturate partial opacity
    pub saturation_passes: u32,
    /// Minimum saturated coverage for a pixel to become white
    pub threshold: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            saturation_passes: DEFAULT_SATURATION_PASSES,
            threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

/// Strictly binary mask, fully opaque
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMask {
    image: RgbaImage,
}

impl NormalizedMask {
    /// Build a mask from a predicate; `true` marks an editable pixel
    pub fn from_fn<F>(width: u32, height: u32, mut editable: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            if editable(x, y) { WHITE } else { BLACK }
        });
        Self { image }
    }

    /// Normalize an arbitrary image (for instance a mask loaded from disk)
    pub fn from_image(img: &DynamicImage) -> Option<Self> {
        normalize_stroke_buffer(&img.to_rgba8(), &NormalizeOptions::default())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when the model output may replace the original at (x, y)
    pub fn is_editable(&self, x: u32, y: u32) -> bool {
        *self.image.get_pixel(x, y) == WHITE
    }

    /// Number of editable (white) pixels
    pub fn editable_count(&self) -> usize {
        self.image.pixels().filter(|p| **p == WHITE).count()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Resize with nearest-neighbour sampling, which keeps the mask binary
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Self {
            image: imageops::resize(&self.image, width, height, FilterType::Nearest),
        }
    }

    /// PNG encoding, as attached to model requests
    pub fn to_png(&self) -> Result<Vec<u8>> {
        codec::encode_png(&DynamicImage::ImageRgba8(self.image.clone()))
    }
}

/// Selectedness of a stroke pixel: alpha weighted by its brightest channel.
/// Transparent and black pixels select nothing.
pub fn coverage(pixel: &Rgba<u8>) -> u8 {
    let Rgba([r, g, b, a]) = *pixel;
    let peak = r.max(g).max(b) as u32;
    ((a as u32 * peak + 127) / 255) as u8
}

/// Composite a coverage value onto itself `passes` times (source-over)
pub fn saturate(coverage: u8, passes: u32) -> u8 {
    let mut a = coverage as u32;
    for _ in 0..passes {
        if a == 0 || a == 255 {
            break;
        }
        a = (a + (a * (255 - a) + 127) / 255).min(255);
    }
    a as u8
}

/// Normalize a stroke layer into a binary mask.
///
/// Returns `None` for an empty (zero-sized) buffer.
pub fn normalize_stroke_buffer(
    buffer: &RgbaImage,
    options: &NormalizeOptions,
) -> Option<NormalizedMask> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut image = RgbaImage::new(width, height);
    for (src, dst) in buffer.pixels().zip(image.pixels_mut()) {
        let saturated = saturate(coverage(src), options.saturation_passes);
        *dst = if saturated >= options.threshold {
            WHITE
        } else {
            BLACK
        };
    }

    Some(NormalizedMask { image })
}
