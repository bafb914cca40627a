//! Image decoding/encoding and `data:` URI helpers
//!
//! Images travel between the pipeline, the remote model and project files
//! either as raw encoded bytes or as base64 data URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::error::{RestyleError, Result};

/// JPEG quality used for every image handed to the model
pub const JPEG_QUALITY: u8 = 95;

/// Decoded payload of a `data:<mime>;base64,<data>` URI
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Parse a base64 data URI
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| RestyleError::DataUri("missing 'data:' prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| RestyleError::DataUri("missing ',' separator".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| RestyleError::DataUri("only base64 payloads are supported".to_string()))?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| RestyleError::DataUri(format!("bad base64 payload: {}", e)))?;

        Ok(Self::new(mime, bytes))
    }

    /// Base64 payload without the `data:` header
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Display for DataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.base64())
    }
}

/// Decode image bytes, guessing the format from the content
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RestyleError::Decode(format!("failed to guess image format: {}", e)))?
        .decode()
        .map_err(|e| RestyleError::Decode(e.to_string()))
}

/// Encode an image as PNG
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    encode_image(img, ImageFormat::Png)
}

/// Encode an image as JPEG at [`JPEG_QUALITY`]
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    encode_image(img, ImageFormat::Jpeg)
}

/// Encode an image in the given format. Only JPEG and PNG are supported;
/// any other format falls back to PNG.
pub fn encode_image(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
            encoder
                .encode_image(&rgb)
                .map_err(|e| RestyleError::Encode(e.to_string()))?;
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| RestyleError::Encode(e.to_string()))?;
        }
    }
    Ok(bytes)
}

/// Format of encoded bytes, if recognised
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// MIME type for a supported output format
pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        _ => "image/png",
    }
}
