//! Integration tests for cropping, tiling and compositing
//!
//! Images are small deterministic patterns encoded in memory, so every
//! expected pixel can be computed up front.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use room_restyle::codec::{DataUri, decode_image, encode_jpeg, encode_png, sniff_format};
use room_restyle::composite::{composite, composite_data_uri, composite_encoded, composite_inline};
use room_restyle::crop::{CropOptions, CropRect, CropRegion, crop_encoded, crop_with_context};
use room_restyle::mask::{MaskSession, NormalizedMask, Point, StrokeMode};
use room_restyle::RestyleError;
use room_restyle::tile::{
    DEFAULT_TILE_CANVAS, MAX_TILE_COUNT, TileOptions, tile_encoded, tile_texture,
};

fn create_solid_image(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

fn draw_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

// A photo stand-in where every pixel is distinct from pure red
fn create_room_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 200) as u8, (y % 250) as u8, 120, 255])
    })
}

fn png(img: &RgbaImage) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgba8(img.clone())).unwrap()
}

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

// ============================================================================
// Crop
// ============================================================================

#[test]
fn test_crop_stays_inside_source() {
    let sizes = [(1000, 800), (37, 91), (1, 1)];
    let boxes = [
        (0.0, 0.0, 10.0, 10.0),
        (95.0, 95.0, 5.0, 5.0),
        (0.0, 50.0, 100.0, 50.0),
        (33.3, 66.6, 12.5, 7.7),
        (99.0, 0.0, 1.0, 100.0),
    ];

    for (w, h) in sizes {
        for (x, y, bw, bh) in boxes {
            for expand in [0.0, 0.4, 0.6, 2.0] {
                let rect = CropRegion::new(CropRect::new(x, y, bw, bh), expand)
                    .resolve(w, h)
                    .unwrap();
                assert!(rect.width > 0 && rect.height > 0);
                assert!(rect.x + rect.width <= w, "{:?} in {}x{}", rect, w, h);
                assert!(rect.y + rect.height <= h, "{:?} in {}x{}", rect, w, h);
            }
        }
    }
}

#[test]
fn test_crop_boundary_box_with_detail_expansion() {
    let rect = CropRegion::new(CropRect::new(0.0, 0.0, 10.0, 10.0), 0.6)
        .resolve(1000, 800)
        .unwrap();
    assert_eq!((rect.x, rect.y), (0, 0));
    // Offsets are clamped before the size is checked, so the full grown size is kept
    assert_eq!((rect.width, rect.height), (220, 176));
}

#[test]
fn test_crop_samples_only_the_region() {
    let mut img = create_solid_image(100, 100, BLUE);
    draw_rect(&mut img, 40, 40, 20, 20, GREEN);

    let out = crop_with_context(
        &DynamicImage::ImageRgba8(img),
        &CropRegion::new(CropRect::new(40.0, 40.0, 20.0, 20.0), 0.0),
        &CropOptions {
            output_width: 40,
            filter: FilterType::Nearest,
        },
    )
    .unwrap();

    assert_eq!(out.dimensions(), (40, 40));
    assert!(out.to_rgba8().pixels().all(|p| *p == GREEN));
}

#[test]
fn test_crop_encoded_is_jpeg() {
    let bytes = png(&create_room_image(300, 200));
    let out = crop_encoded(
        &bytes,
        &CropRegion::new(CropRect::new(10.0, 10.0, 50.0, 50.0), 0.4),
        &CropOptions::default(),
    )
    .unwrap();
    assert_eq!(sniff_format(&out), Some(ImageFormat::Jpeg));
    assert_eq!(decode_image(&out).unwrap().width(), 1024);
}

#[test]
fn test_crop_of_garbage_fails() {
    let region = CropRegion::new(CropRect::new(0.0, 0.0, 50.0, 50.0), 0.4);
    assert!(crop_encoded(b"garbage", &region, &CropOptions::default()).is_err());
}

// ============================================================================
// Tile
// ============================================================================

#[test]
fn test_tiling_once_is_identity() {
    let img = DynamicImage::ImageRgba8(create_room_image(17, 9));
    assert_eq!(tile_texture(&img, 1, &TileOptions::default()).unwrap(), img);
    assert_eq!(tile_texture(&img, 0, &TileOptions::default()).unwrap(), img);

    let bytes = encode_jpeg(&img).unwrap();
    assert_eq!(tile_encoded(&bytes, 1, &TileOptions::default()).unwrap(), bytes);
}

#[test]
fn test_tiling_grid_under_nearest() {
    let mut texture = create_solid_image(4, 4, RED);
    draw_rect(&mut texture, 2, 0, 2, 4, GREEN);
    let texture = DynamicImage::ImageRgba8(texture);

    for count in 2..=4u32 {
        let options = TileOptions {
            size: 4 * count,
            filter: FilterType::Nearest,
        };
        let tiled = tile_texture(&texture, count, &options).unwrap().to_rgba8();
        assert_eq!(tiled.dimensions(), (4 * count, 4 * count));

        // Each cell is an exact copy of the source
        for (x, y, pixel) in tiled.enumerate_pixels() {
            let expected = texture.get_pixel(x % 4, y % 4);
            assert_eq!(*pixel, expected, "count {} at ({}, {})", count, x, y);
        }
    }
}

#[test]
fn test_tiled_output_is_square_jpeg() {
    let bytes = png(&create_room_image(30, 10));
    let out = tile_encoded(
        &bytes,
        3,
        &TileOptions {
            size: 90,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(sniff_format(&out), Some(ImageFormat::Jpeg));
    assert_eq!(decode_image(&out).unwrap().dimensions(), (90, 90));
}

#[test]
fn test_tile_count_limits() {
    let bytes = png(&create_solid_image(4, 4, RED));

    // Far beyond any grid: reported, not a panic
    assert!(matches!(
        tile_encoded(&bytes, u32::MAX, &TileOptions::default()),
        Err(RestyleError::InvalidTileCount(_))
    ));
    assert!(matches!(
        tile_encoded(&bytes, MAX_TILE_COUNT + 1, &TileOptions::default()),
        Err(RestyleError::InvalidTileCount(_))
    ));

    // More cells than canvas pixels: the canvas never grows
    let texture = DynamicImage::ImageRgba8(create_solid_image(4, 4, RED));
    let options = TileOptions {
        size: 4,
        filter: FilterType::Nearest,
    };
    assert!(tile_texture(&texture, 5, &options).is_err());
    assert_eq!(
        tile_texture(&texture, 4, &options).unwrap().dimensions(),
        (4, 4)
    );

    let at_limit = tile_encoded(&bytes, MAX_TILE_COUNT, &TileOptions::default()).unwrap();
    assert_eq!(
        decode_image(&at_limit).unwrap().dimensions(),
        (DEFAULT_TILE_CANVAS, DEFAULT_TILE_CANVAS)
    );
}

// ============================================================================
// Composite
// ============================================================================

#[test]
fn test_black_mask_pixels_keep_the_original() {
    let original = create_room_image(64, 48);
    let generated = create_solid_image(64, 48, RED);
    let mask = NormalizedMask::from_fn(64, 48, |x, y| (x / 8 + y / 8) % 2 == 0);

    let out = composite(&original, &generated, &mask);
    for (x, y, pixel) in out.enumerate_pixels() {
        if mask.is_editable(x, y) {
            assert_eq!(*pixel, RED);
        } else {
            assert_eq!(pixel, original.get_pixel(x, y));
        }
    }
}

#[test]
fn test_composite_resizes_mask_and_output() {
    let original = create_room_image(80, 60);
    let generated = create_solid_image(40, 30, RED);
    // Left half editable, at a quarter of the resolution
    let mask = NormalizedMask::from_fn(20, 15, |x, _| x < 10);

    let out = composite(&original, &generated, &mask);
    assert_eq!(out.dimensions(), (80, 60));
    assert_eq!(*out.get_pixel(5, 5), RED);
    assert_eq!(out.get_pixel(70, 5), original.get_pixel(70, 5));
}

#[test]
fn test_undecodable_generated_image_is_returned_as_is() {
    let original = png(&create_room_image(10, 10));
    let mask = NormalizedMask::from_fn(10, 10, |_, _| true);
    let broken = b"\x89PNG but not really".to_vec();

    assert_eq!(composite_encoded(&original, &broken, &mask), broken);

    let generated = DataUri::new("image/png", broken.clone());
    let inline = composite_inline(&DataUri::new("image/png", original), &generated, &mask);
    assert_eq!(inline, generated);

    let text = generated.to_string();
    assert_eq!(composite_data_uri("data:image/png;base64,%%", &text, &mask), text);
}

#[test]
fn test_output_format_follows_original() {
    let mask = NormalizedMask::from_fn(8, 8, |x, _| x < 4);
    let generated = png(&create_solid_image(8, 8, RED));

    let from_png = composite_encoded(&png(&create_room_image(8, 8)), &generated, &mask);
    assert_eq!(sniff_format(&from_png), Some(ImageFormat::Png));

    let jpeg = encode_jpeg(&DynamicImage::ImageRgba8(create_room_image(8, 8))).unwrap();
    let from_jpeg = composite_encoded(&jpeg, &generated, &mask);
    assert_eq!(sniff_format(&from_jpeg), Some(ImageFormat::Jpeg));
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_painted_region_end_to_end() {
    let (width, height) = (1000, 800);
    let original = create_room_image(width, height);

    // Cover the 200x150 box at (100, 100) with horizontal strokes
    let mut session = MaskSession::new(width, height);
    let brush = 20.0;
    let mut y = 100.0;
    while y <= 250.0 {
        session.begin_stroke(Point::new(100.0, y), brush, StrokeMode::Paint);
        session.extend_stroke(Point::new(300.0, y));
        session.end_stroke();
        y += 10.0;
    }
    let mask = session.export_normalized_mask().unwrap();

    let generated = png(&create_solid_image(width, height, RED));
    let merged = composite_encoded(&png(&original), &generated, &mask);
    let merged = decode_image(&merged).unwrap().to_rgba8();

    let dilation = (brush / 2.0) as u32 + 1;
    for (x, y, pixel) in merged.enumerate_pixels() {
        let inside_box = (100..300).contains(&x) && (100..250).contains(&y);
        let near_box = (100 - dilation..300 + dilation).contains(&x)
            && (100 - dilation..250 + dilation).contains(&y);

        if mask.is_editable(x, y) {
            assert_eq!(*pixel, RED, "({}, {})", x, y);
            assert!(near_box, "edit leaked to ({}, {})", x, y);
        } else {
            assert_eq!(pixel, original.get_pixel(x, y), "({}, {})", x, y);
            assert!(!inside_box, "gap in painted box at ({}, {})", x, y);
        }
    }
}
