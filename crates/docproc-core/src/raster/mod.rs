//! Page rasterization: turning a source artifact into ordered page images.

mod pdfium;

pub use pdfium::PdfiumRasterizer;

use std::path::{Path, PathBuf};

use crate::error::RasterError;

/// Declared document type selecting the extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Multi-page PDF; each page is rendered to an image.
    Pdf,
    /// Single raster image; passed through as the only page.
    Image,
}

impl DocumentKind {
    /// Resolve the caller-declared type string.
    pub fn from_declared(declared: &str) -> Result<Self, RasterError> {
        match declared {
            "pdf" => Ok(DocumentKind::Pdf),
            "image" => Ok(DocumentKind::Image),
            other => Err(RasterError::UnsupportedType(other.to_string())),
        }
    }
}

/// Produces an ordered sequence of page images from a local artifact.
///
/// The contract downstream consumers rely on: one path per page, in page
/// order, so index `i` corresponds to 1-based page number `i + 1`.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(
        &self,
        artifact: &Path,
        kind: DocumentKind,
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterError>;
}

/// Rasterizer returning pre-baked page images, for tests that must not
/// depend on the PDFium binary.
pub struct MockRasterizer {
    pages: Vec<Vec<u8>>,
}

impl MockRasterizer {
    /// Serve the given PNG byte buffers as the document's pages.
    pub fn new(pages: Vec<Vec<u8>>) -> Self {
        Self { pages }
    }

    /// Serve `count` minimal blank pages.
    pub fn blank(count: usize) -> Self {
        Self {
            pages: vec![minimal_png(); count],
        }
    }
}

impl PageRasterizer for MockRasterizer {
    fn rasterize(
        &self,
        artifact: &Path,
        kind: DocumentKind,
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterError> {
        if kind == DocumentKind::Image {
            return Ok(vec![artifact.to_path_buf()]);
        }
        if self.pages.is_empty() {
            return Err(RasterError::NoPages);
        }

        let mut paths = Vec::with_capacity(self.pages.len());
        for (i, bytes) in self.pages.iter().enumerate() {
            let path = work_dir.join(format!("page_{}.png", i + 1));
            std::fs::write(&path, bytes).map_err(|e| RasterError::Render {
                page: (i + 1) as u32,
                reason: e.to_string(),
            })?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Minimal blank page PNG (16x16 white), for tests that need a decodable
/// page image without fixture files.
pub fn minimal_png() -> Vec<u8> {
    let image = image::GrayImage::from_pixel(16, 16, image::Luma([255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("in-memory PNG encoding cannot fail");
    bytes
}
