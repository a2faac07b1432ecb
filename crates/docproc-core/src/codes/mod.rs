//! QR code extraction from page images.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::record::BoundingBox;

/// A QR code decoded from one page.
///
/// No ordering guarantee among multiple codes on the same page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    /// 1-based page number matching the rasterizer's page order.
    pub page: u32,

    /// Decoded payload string.
    pub data: String,

    /// Pixel bounding box of the code on the page.
    pub position: BoundingBox,
}

/// Decode all QR codes on one page image.
///
/// An empty result is valid, not an error. An unreadable image file or a
/// grid that fails to decode is a soft failure: it is logged and skipped,
/// the run continues.
pub fn read_codes(image_path: &Path, page: u32) -> Vec<QrCode> {
    let image = match image::open(image_path) {
        Ok(image) => image,
        Err(e) => {
            warn!(page, path = %image_path.display(), error = %e, "failed to open page image for QR decoding");
            return Vec::new();
        }
    };

    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| luma.get_pixel(x as u32, y as u32)[0],
    );

    let mut codes = Vec::new();
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, data)) => {
                codes.push(QrCode {
                    page,
                    data,
                    position: bounds_to_box(&grid.bounds),
                });
            }
            Err(e) => {
                debug!(page, error = %e, "detected grid failed to decode");
            }
        }
    }

    debug!(page, count = codes.len(), "QR extraction complete");
    codes
}

/// Convert the decoder's four corner points to an axis-aligned box.
fn bounds_to_box(bounds: &[rqrr::Point; 4]) -> BoundingBox {
    let min_x = bounds.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = bounds.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = bounds.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = bounds.iter().map(|p| p.y).max().unwrap_or(0);

    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

#[cfg(test)]
pub(crate) fn encode_qr_png(payload: &str) -> Vec<u8> {
    use std::io::Cursor;

    // Render at 8 px per module with a 4-module quiet zone.
    let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
    let colors = code.to_colors();
    let modules = code.width();
    let scale = 8u32;
    let quiet = 4u32 * scale;
    let size = modules as u32 * scale + 2 * quiet;

    let image = image::GrayImage::from_fn(size, size, |x, y| {
        let inside = x >= quiet && y >= quiet;
        let mx = (x.wrapping_sub(quiet) / scale) as usize;
        let my = (y.wrapping_sub(quiet) / scale) as usize;
        let dark = inside
            && mx < modules
            && my < modules
            && colors[my * modules + mx] == qrcode::Color::Dark;
        image::Luma([if dark { 0u8 } else { 255u8 }])
    });

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
