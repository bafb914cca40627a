//! Mask-enforced compositing of model output
//!
//! The remote model does not reliably respect region boundaries, so after a
//! masked edit the generated image is clipped by the mask and laid over the
//! original. Every black-mask pixel of the result is the original pixel.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::{debug, warn};

use crate::codec::{self, DataUri};
use crate::error::Result;
use crate::mask::NormalizedMask;

/// Composite `generated` over `original` wherever `mask` is white.
///
/// `generated` is resized to the original dimensions when they differ; so is
/// the mask (nearest-neighbour, which keeps it binary).
pub fn composite(original: &RgbaImage, generated: &RgbaImage, mask: &NormalizedMask) -> RgbaImage {
    let (width, height) = original.dimensions();

    let generated = if generated.dimensions() == (width, height) {
        generated.clone()
    } else {
        debug!(
            "resizing generated image {:?} -> {}x{}",
            generated.dimensions(),
            width,
            height
        );
        imageops::resize(generated, width, height, FilterType::Lanczos3)
    };
    let mask = mask.resized(width, height);

    // Off-screen layer: generated pixels only where the mask allows
    let mut layer = RgbaImage::new(width, height);
    for (x, y, pixel) in layer.enumerate_pixels_mut() {
        if mask.is_editable(x, y) {
            *pixel = *generated.get_pixel(x, y);
        }
    }

    let mut output = original.clone();
    for (out, src) in output.pixels_mut().zip(layer.pixels()) {
        *out = source_over(*src, *out);
    }
    output
}

/// Straight-alpha source-over. A transparent source leaves `dst` untouched.
fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    match src[3] {
        0 => dst,
        255 => src,
        sa => {
            let sa = sa as f32 / 255.0;
            let da = dst[3] as f32 / 255.0;
            let out_a = sa + da * (1.0 - sa);
            let channel = |s: u8, d: u8| {
                ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a)
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            Rgba([
                channel(src[0], dst[0]),
                channel(src[1], dst[1]),
                channel(src[2], dst[2]),
                (out_a * 255.0).round() as u8,
            ])
        }
    }
}

/// Composite encoded images and encode the result in the original's format.
///
/// Any decode or encode failure returns `generated` unchanged: partial
/// enforcement beats failing the whole request.
pub fn composite_encoded(original: &[u8], generated: &[u8], mask: &NormalizedMask) -> Vec<u8> {
    match try_composite_encoded(original, generated, mask) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("mask compositing skipped, returning model output as-is: {}", e);
            generated.to_vec()
        }
    }
}

fn try_composite_encoded(
    original: &[u8],
    generated: &[u8],
    mask: &NormalizedMask,
) -> Result<Vec<u8>> {
    let format = output_format(original);
    let original = codec::decode_image(original)?.to_rgba8();
    let generated = codec::decode_image(generated)?.to_rgba8();
    let merged = composite(&original, &generated, mask);
    codec::encode_image(&DynamicImage::ImageRgba8(merged), format)
}

/// Composite decoded data URIs; the result keeps the original's format.
///
/// Falls back to a copy of `generated` like [`composite_encoded`].
pub fn composite_inline(original: &DataUri, generated: &DataUri, mask: &NormalizedMask) -> DataUri {
    let format = output_format(&original.bytes);
    match try_composite_encoded(&original.bytes, &generated.bytes, mask) {
        Ok(bytes) => DataUri::new(codec::mime_for_format(format), bytes),
        Err(e) => {
            warn!("mask compositing skipped, returning model output as-is: {}", e);
            generated.clone()
        }
    }
}

/// Same as [`composite_inline`] for data URI text
pub fn composite_data_uri(original: &str, generated: &str, mask: &NormalizedMask) -> String {
    match (DataUri::parse(original), DataUri::parse(generated)) {
        (Ok(original), Ok(parsed)) => composite_inline(&original, &parsed, mask).to_string(),
        (Err(e), _) | (_, Err(e)) => {
            warn!("mask compositing skipped, returning model output as-is: {}", e);
            generated.to_string()
        }
    }
}

fn output_format(original: &[u8]) -> ImageFormat {
    match codec::sniff_format(original) {
        Some(ImageFormat::Jpeg) => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    }
}
