//! Detail-shot cropping with surrounding context
//!
//! The user picks a box on the rendered image in percent of its size. The
//! box is grown on every side so the model sees some of the surroundings,
//! clamped to the image, then scaled to a fixed output width.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{RestyleError, Result};

/// Default growth per side, as a fraction of the box size
pub const DEFAULT_CONTEXT_EXPANSION: f64 = 0.4;

/// Growth used for detail shots (more room for background bokeh)
pub const DETAIL_CONTEXT_EXPANSION: f64 = 0.6;

/// Width of every crop handed to the model
pub const DEFAULT_OUTPUT_WIDTH: u32 = 1024;

const SNAP_EPSILON: f64 = 1e-6;

/// Box in percent (0-100) of the source dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Integer pixel rectangle inside a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A percent box plus the context expansion applied before cropping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub rect: CropRect,
    pub context_expansion: f64,
}

impl CropRegion {
    pub fn new(rect: CropRect, context_expansion: f64) -> Self {
        Self {
            rect,
            context_expansion,
        }
    }

    /// Expanded, clamped pixel rectangle for a source of the given size.
    ///
    /// Offsets are clamped first, then the size is reduced so the region
    /// ends inside the source. The result is at least 1x1.
    pub fn resolve(&self, src_width: u32, src_height: u32) -> Result<PixelRect> {
        let CropRect {
            x,
            y,
            width,
            height,
        } = self.rect;
        let ratio = self.context_expansion;

        if ![x, y, width, height, ratio].iter().all(|v| v.is_finite()) {
            return Err(RestyleError::InvalidCrop(
                "coordinates must be finite".to_string(),
            ));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(RestyleError::InvalidCrop(
                "width and height must be positive".to_string(),
            ));
        }
        if ratio < 0.0 {
            return Err(RestyleError::InvalidCrop(
                "context expansion cannot be negative".to_string(),
            ));
        }
        if src_width == 0 || src_height == 0 {
            return Err(RestyleError::InvalidCrop("source image is empty".to_string()));
        }

        let (sw, sh) = (src_width as f64, src_height as f64);
        let mut w = width / 100.0 * sw;
        let mut h = height / 100.0 * sh;
        let mut px = x / 100.0 * sw;
        let mut py = y / 100.0 * sh;

        let grow_w = w * ratio;
        let grow_h = h * ratio;
        px -= grow_w;
        py -= grow_h;
        w += grow_w * 2.0;
        h += grow_h * 2.0;

        if px < 0.0 {
            px = 0.0;
        }
        if py < 0.0 {
            py = 0.0;
        }
        if px + w > sw {
            w = sw - px;
        }
        if py + h > sh {
            h = sh - py;
        }

        if w <= 0.0 || h <= 0.0 {
            return Err(RestyleError::InvalidCrop(
                "region lies outside the source image".to_string(),
            ));
        }

        // Snap outward to whole pixels, ignoring float noise
        let x0 = ((px + SNAP_EPSILON).floor() as u32).min(src_width - 1);
        let y0 = ((py + SNAP_EPSILON).floor() as u32).min(src_height - 1);
        let x1 = ((px + w - SNAP_EPSILON).ceil() as u32).min(src_width);
        let y1 = ((py + h - SNAP_EPSILON).ceil() as u32).min(src_height);

        Ok(PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        })
    }
}

/// Options for [`crop_with_context`]
#[derive(Debug, Clone, Copy)]
pub struct CropOptions {
    /// Output width; the height follows the region's aspect ratio
    pub output_width: u32,
    pub filter: FilterType,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            output_width: DEFAULT_OUTPUT_WIDTH,
            filter: FilterType::Triangle,
        }
    }
}

/// Crop the expanded region and scale it to the output width
pub fn crop_with_context(
    img: &DynamicImage,
    region: &CropRegion,
    options: &CropOptions,
) -> Result<DynamicImage> {
    let (src_w, src_h) = img.dimensions();
    let rect = region.resolve(src_w, src_h)?;

    let out_w = options.output_width.max(1);
    let out_h = ((rect.height as f64 / rect.width as f64) * out_w as f64)
        .round()
        .max(1.0) as u32;

    debug!(
        "crop {}x{} at ({}, {}) from {}x{} -> {}x{}",
        rect.width, rect.height, rect.x, rect.y, src_w, src_h, out_w, out_h
    );

    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    Ok(cropped.resize_exact(out_w, out_h, options.filter))
}

/// Decode, crop and re-encode as JPEG for the model
pub fn crop_encoded(bytes: &[u8], region: &CropRegion, options: &CropOptions) -> Result<Vec<u8>> {
    let img = codec::decode_image(bytes)?;
    let cropped = crop_with_context(&img, region, options)?;
    codec::encode_jpeg(&cropped)
}
