//! PDF page rendering via Google PDFium.
//!
//! `PdfiumRasterizer` is stateless (`Send + Sync`). Each operation creates a
//! fresh `Pdfium` instance because the upstream type is `!Send`; the OS
//! caches `dlopen` calls, so repeat loads are near-free.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use tracing::debug;

use super::{DocumentKind, PageRasterizer};
use crate::error::RasterError;

/// Fixed upscale factor applied when rendering PDF pages, for recognition
/// fidelity on small print. One PDF point maps to `RENDER_SCALE` pixels.
const RENDER_SCALE: f32 = 2.0;

/// Renders PDF pages to PNG images using Google PDFium.
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Create a rasterizer, verifying the PDFium library is loadable
    /// (fail-fast at service startup rather than mid-run).
    pub fn new() -> Result<Self, RasterError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path to the library file)
/// 2. Alongside the running executable
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, RasterError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| RasterError::Load(format!("failed to load PDFium from {path}: {e}")))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        RasterError::Load(format!(
            "PDFium library not found; set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        artifact: &Path,
        kind: DocumentKind,
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterError> {
        match kind {
            // Image artifacts are processed directly as the only page.
            DocumentKind::Image => Ok(vec![artifact.to_path_buf()]),
            DocumentKind::Pdf => render_pdf_pages(artifact, work_dir),
        }
    }
}

fn render_pdf_pages(artifact: &Path, work_dir: &Path) -> Result<Vec<PathBuf>, RasterError> {
    let bytes = std::fs::read(artifact)
        .map_err(|e| RasterError::Load(format!("failed to read artifact: {e}")))?;

    let pdfium = load_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(&bytes, None)
        .map_err(|e| RasterError::Load(format!("failed to load PDF: {e}")))?;

    let pages = document.pages();
    if pages.is_empty() {
        return Err(RasterError::NoPages);
    }

    let mut paths = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        let page_number = (index + 1) as u32;
        let width = (page.width().value * RENDER_SCALE).max(1.0) as i32;
        let height = (page.height().value * RENDER_SCALE).max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(height);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RasterError::Render {
                page: page_number,
                reason: format!("rendering failed: {e}"),
            })?;

        let path = work_dir.join(format!("page_{page_number}.png"));
        bitmap
            .as_image()
            .save(&path)
            .map_err(|e| RasterError::Render {
                page: page_number,
                reason: format!("PNG encoding failed: {e}"),
            })?;

        debug!(page = page_number, width, height, "rendered PDF page");
        paths.push(path);
    }

    Ok(paths)
}
