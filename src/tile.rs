//! Texture tiling
//!
//! Repeats a material reference on an N×N grid so the model perceives a
//! denser, smaller-scale pattern than the raw photo shows.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use log::debug;

use crate::codec;
use crate::error::{RestyleError, Result};

/// Side of the square tiled output
pub const DEFAULT_TILE_CANVAS: u32 = 2048;

/// Largest grid the UI offers
pub const MAX_TILE_COUNT: u32 = 10;

/// Options for [`tile_texture`]
#[derive(Debug, Clone, Copy)]
pub struct TileOptions {
    /// Side of the square output, in pixels
    pub size: u32,
    pub filter: FilterType,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_TILE_CANVAS,
            filter: FilterType::Lanczos3,
        }
    }
}

/// Edge of grid cell `i` out of `count` along a side of `size` pixels
fn cell_edge(i: u32, count: u32, size: u32) -> u32 {
    ((i as u64 * size as u64) / count as u64) as u32
}

/// Reject grids the canvas cannot hold, or that exceed [`MAX_TILE_COUNT`]
fn check_tile_count(tile_count: u32, size: u32) -> Result<()> {
    if tile_count > MAX_TILE_COUNT {
        return Err(RestyleError::InvalidTileCount(format!(
            "{} exceeds the maximum of {}",
            tile_count, MAX_TILE_COUNT
        )));
    }
    if tile_count > size {
        return Err(RestyleError::InvalidTileCount(format!(
            "{}x{} grid does not fit a {}px canvas",
            tile_count, tile_count, size
        )));
    }
    Ok(())
}

/// Tile `texture` into a `tile_count × tile_count` grid.
///
/// A count of 0 or 1 returns the texture untouched. The output is always
/// `options.size` square; counts above [`MAX_TILE_COUNT`] or above the
/// canvas size are rejected.
pub fn tile_texture(
    texture: &DynamicImage,
    tile_count: u32,
    options: &TileOptions,
) -> Result<DynamicImage> {
    if tile_count <= 1 {
        return Ok(texture.clone());
    }
    check_tile_count(tile_count, options.size)?;

    let size = options.size;
    let source = texture.to_rgba8();
    let mut canvas = RgbaImage::new(size, size);

    debug!(
        "tiling {}x{} texture into {}x{} grid on {}px canvas",
        source.width(),
        source.height(),
        tile_count,
        tile_count,
        size
    );

    for row in 0..tile_count {
        let y0 = cell_edge(row, tile_count, size);
        let cell_h = cell_edge(row + 1, tile_count, size) - y0;
        for col in 0..tile_count {
            let x0 = cell_edge(col, tile_count, size);
            let cell_w = cell_edge(col + 1, tile_count, size) - x0;
            let cell = imageops::resize(&source, cell_w, cell_h, options.filter);
            imageops::replace(&mut canvas, &cell, x0 as i64, y0 as i64);
        }
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Tile encoded texture bytes, returning JPEG.
///
/// A count of 0 or 1 returns the input bytes as-is, without decoding.
pub fn tile_encoded(bytes: &[u8], tile_count: u32, options: &TileOptions) -> Result<Vec<u8>> {
    if tile_count <= 1 {
        return Ok(bytes.to_vec());
    }
    check_tile_count(tile_count, options.size)?;
    let texture = codec::decode_image(bytes)?;
    codec::encode_jpeg(&tile_texture(&texture, tile_count, options)?)
}
