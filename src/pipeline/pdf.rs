//! PDF access via pdfium: native text layer and page rasterisation.
//!
//! pdfium is a shared library bound at runtime. When it cannot be found the
//! functions here report [`FailureKind::CapabilityUnavailable`] instead of
//! failing the request, so a missing library degrades a PDF upload to a
//! placeholder exactly like a missing OCR engine does.
//!
//! All work is CPU-bound FFI and runs inside `spawn_blocking`.
//!
//! [`FailureKind::CapabilityUnavailable`]: crate::error::FailureKind::CapabilityUnavailable

use crate::error::ExtractionFailure;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Env var pointing at a pdfium library file, or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Read the text layer of every page.
///
/// Pages are joined with a blank line and the result is trimmed; an empty
/// string means the PDF has no text layer (typically a scan).
pub async fn extract_text_layer(bytes: Vec<u8>) -> Result<String, ExtractionFailure> {
    tokio::task::spawn_blocking(move || extract_text_layer_blocking(&bytes))
        .await
        .map_err(|e| ExtractionFailure::engine(format!("PDF text task panicked: {e}")))?
}

/// Rasterise every page, longest edge capped at `max_pixels`.
pub async fn render_pages(
    bytes: Vec<u8>,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractionFailure> {
    tokio::task::spawn_blocking(move || render_pages_blocking(&bytes, max_pixels))
        .await
        .map_err(|e| ExtractionFailure::engine(format!("PDF render task panicked: {e}")))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionFailure> {
    if let Ok(configured) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let path = Path::new(&configured);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(path)
        } else {
            path.to_path_buf()
        };
        debug!("Binding pdfium from {}", lib.display());
        let bindings = Pdfium::bind_to_library(&lib).map_err(|e| {
            ExtractionFailure::unavailable(format!(
                "PDF engine (pdfium) could not be loaded from {}: {e}",
                lib.display()
            ))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionFailure::unavailable(format!(
            "PDF engine (pdfium) not installed; set {PDFIUM_LIB_PATH_ENV} to enable PDF reading ({e})"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn extract_text_layer_blocking(bytes: &[u8]) -> Result<String, ExtractionFailure> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(map_load_error)?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                warn!("Page {}: no text layer ({:?})", idx + 1, e);
                String::new()
            }
        };
        debug!("Page {}: {} chars of text layer", idx + 1, text.len());
        texts.push(text);
    }

    Ok(texts.join("\n\n").trim().to_string())
}

fn render_pages_blocking(
    bytes: &[u8],
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractionFailure> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(map_load_error)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    let mut images = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionFailure::engine(format!("Rendering page {} failed: {e:?}", idx + 1))
        })?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}

/// Password-protected and corrupt files are the upload's fault, not ours.
fn map_load_error(e: PdfiumError) -> ExtractionFailure {
    let detail = format!("{e:?}");
    if detail.to_lowercase().contains("password") {
        ExtractionFailure::malformed("PDF is password-protected and cannot be read")
    } else {
        ExtractionFailure::malformed(format!("PDF could not be opened: {detail}"))
    }
}
