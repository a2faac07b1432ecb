//! OCR backends.

use image::DynamicImage;

use super::TokenDetail;
use crate::error::OcrError;

/// Produces recognized tokens from a page image, in reading order.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TokenDetail>, OcrError>;
}

/// OCR backend backed by `pure-onnx-ocr` (pure Rust, no external runtime).
#[cfg(feature = "native")]
pub struct PureOcrBackend {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

#[cfg(feature = "native")]
impl PureOcrBackend {
    /// Create a backend from model files in a directory: `det.onnx`,
    /// `latin_rec.onnx` and `latin_dict.txt`.
    pub fn from_dir(model_dir: &std::path::Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        tracing::info!("loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

#[cfg(feature = "native")]
impl OcrBackend for PureOcrBackend {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TokenDetail>, OcrError> {
        use crate::models::record::BoundingBox;

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut tokens: Vec<TokenDetail> = results
            .iter()
            .map(|r| {
                // Recognition scores come back in 0-1; tokens carry 0-100.
                TokenDetail {
                    text: r.text.clone(),
                    confidence: r.confidence * 100.0,
                    position: polygon_to_box(&r.bounding_box),
                }
            })
            .collect();

        // Sort into reading order: rows top-to-bottom, then left-to-right.
        tokens.sort_by(|a, b| {
            let row_a = a.position.y / 20;
            let row_b = b.position.y / 20;
            if row_a != row_b {
                row_a.cmp(&row_b)
            } else {
                a.position.x.cmp(&b.position.x)
            }
        });

        fn polygon_to_box(polygon: &pure_onnx_ocr::Polygon<f64>) -> BoundingBox {
            let mut min_x = f64::INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            for coord in polygon.exterior().coords() {
                min_x = min_x.min(coord.x);
                min_y = min_y.min(coord.y);
                max_x = max_x.max(coord.x);
                max_y = max_y.max(coord.y);
            }
            if !min_x.is_finite() {
                return BoundingBox::default();
            }
            BoundingBox {
                x: min_x as i32,
                y: min_y as i32,
                width: (max_x - min_x) as i32,
                height: (max_y - min_y) as i32,
            }
        }

        Ok(tokens)
    }
}

/// Backend returning a fixed token set on every page, for tests that must
/// not depend on model files.
pub struct StaticOcrBackend {
    tokens: Vec<TokenDetail>,
}

impl StaticOcrBackend {
    /// One token per `(text, confidence)` pair, stacked top to bottom.
    pub fn new(lines: &[(&str, f32)]) -> Self {
        use crate::models::record::BoundingBox;

        let tokens = lines
            .iter()
            .enumerate()
            .map(|(i, (text, confidence))| TokenDetail {
                text: text.to_string(),
                confidence: *confidence,
                position: BoundingBox {
                    x: 0,
                    y: (i as i32) * 24,
                    width: 200,
                    height: 20,
                },
            })
            .collect();
        Self { tokens }
    }

    /// Backend that recognizes nothing.
    pub fn empty() -> Self {
        Self { tokens: Vec::new() }
    }
}

impl OcrBackend for StaticOcrBackend {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TokenDetail>, OcrError> {
        Ok(self.tokens.clone())
    }
}

/// Backend that always fails, for exercising the degraded-page path.
pub struct FailingOcrBackend;

impl OcrBackend for FailingOcrBackend {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TokenDetail>, OcrError> {
        Err(OcrError::Recognition("backend unavailable".to_string()))
    }
}
