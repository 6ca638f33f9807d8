//! Image preparation for OCR: grayscale conversion and PNG/base64 encoding.
//!
//! OCR input is reduced to a single luma channel first. Colour carries no
//! text information in a scanned report and dropping it removes coloured
//! backgrounds and stamps that otherwise compete with the print.
//! PNG keeps the result lossless; JPEG artefacts around glyph edges hurt
//! recognition far more than the extra bytes cost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode uploaded image bytes (PNG or JPEG).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Single-channel copy of `img`.
pub fn to_grayscale(img: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(img.to_luma8())
}

/// Encode an image as base64 PNG ready for a vision request.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
