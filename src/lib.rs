//! # room-restyle
//!
//! Image processing and orchestration for AI interior restyling.
//!
//! ## Features
//!
//! - **Inpainting masks**: paint strokes on a [`MaskSession`] and export a
//!   strictly binary [`NormalizedMask`]
//! - **Detail-shot crops**: grow a box with surrounding context and scale it
//!   to a fixed width
//! - **Texture tiling**: repeat a material sample on an N×N grid
//! - **Mask-enforced compositing**: keep model output only inside the mask
//! - **Palette extraction**: dominant colours of a photo as hex swatches
//! - **Orchestration**: prompts, staged retries with fallback, cost tracking
//!
//! ## Example - Masked edit
//!
//! ```rust,ignore
//! use room_restyle::{MaskSession, Point, StrokeMode, composite_encoded};
//!
//! let mut session = MaskSession::new(1000, 800);
//! session.begin_stroke(Point::new(120.0, 120.0), 40.0, StrokeMode::Paint);
//! session.extend_stroke(Point::new(280.0, 220.0));
//! session.end_stroke();
//!
//! let mask = session.export_normalized_mask().unwrap();
//! let merged = composite_encoded(&original_bytes, &generated_bytes, &mask);
//! ```
//!
//! ## Example - Detail crop
//!
//! ```rust,ignore
//! use room_restyle::crop::{CropOptions, CropRect, CropRegion, crop_encoded};
//!
//! let region = CropRegion::new(CropRect::new(40.0, 40.0, 20.0, 20.0), 0.6);
//! let jpeg = crop_encoded(&photo_bytes, &region, &CropOptions::default()).unwrap();
//! ```

pub mod codec;
pub mod composite;
pub mod config;
pub mod crop;
pub mod design;
pub mod error;
pub mod generate;
pub mod mask;
pub mod palette;
pub mod project;
pub mod studio;
pub mod tile;

// Re-export commonly used items
pub use codec::DataUri;
pub use composite::{composite, composite_data_uri, composite_encoded, composite_inline};
pub use config::{AppConfig, ConfigManager, ConfigStore, DirStore, MemoryStore};
pub use crop::{CropOptions, CropRect, CropRegion, crop_encoded, crop_with_context};
pub use design::{AppMode, AspectRatio, DetailShotAngle, GenerationConfig};
pub use error::{RestyleError, Result};
pub use generate::{GenerationError, ImageModel, RemoteError, resolve_credential};
pub use mask::{
    MaskSession, NormalizeOptions, NormalizedMask, Point, StrokeMode, normalize_stroke_buffer,
};
pub use palette::extract_palette;
pub use project::ProjectFile;
pub use studio::{DetailShotRequest, Studio};
pub use tile::{TileOptions, tile_encoded, tile_texture};
