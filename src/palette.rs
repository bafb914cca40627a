//! Dominant colour extraction
//!
//! Samples the image on a fixed pixel stride and ranks the exact colours it
//! sees. Cheap enough to run on a full-resolution photo for a moodboard
//! swatch row.

use image::RgbaImage;
use log::debug;
use std::collections::HashMap;

use crate::codec;
use crate::error::Result;

/// Every n-th pixel, in row-major order, is sampled
pub const SAMPLE_STRIDE: usize = 50;

/// Swatches returned when the caller does not ask for a count
pub const DEFAULT_PALETTE_SIZE: usize = 5;

/// Up to `count` most frequent sampled colours, as `#RRGGBB`.
///
/// Alpha is ignored. Colours with equal counts keep the order in which they
/// were first sampled.
pub fn extract_palette(img: &RgbaImage, count: usize) -> Vec<String> {
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();
    let mut counts: Vec<([u8; 3], u32)> = Vec::new();

    for pixel in img.pixels().step_by(SAMPLE_STRIDE) {
        let rgb = [pixel[0], pixel[1], pixel[2]];
        match index.get(&rgb) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(rgb, counts.len());
                counts.push((rgb, 1));
            }
        }
    }

    debug!(
        "{} distinct colours in {} samples",
        counts.len(),
        counts.iter().map(|(_, n)| *n).sum::<u32>()
    );

    // Stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(count)
        .map(|([r, g, b], _)| format!("#{:02X}{:02X}{:02X}", r, g, b))
        .collect()
}

/// Decode `bytes` and extract its palette
pub fn extract_palette_encoded(bytes: &[u8], count: usize) -> Result<Vec<String>> {
    let img = codec::decode_image(bytes)?;
    Ok(extract_palette(&img.to_rgba8(), count))
}
