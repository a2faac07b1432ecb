//! Text recognition over page images.
//!
//! The [`OcrBackend`] seam produces raw tokens; this module turns them into
//! the per-page result the rest of the pipeline consumes: joined raw text, a
//! formatted variant tuned for downstream field matching, an average
//! confidence, and a bounded set of token details for storage.

mod engine;

pub use engine::{FailingOcrBackend, OcrBackend, StaticOcrBackend};

#[cfg(feature = "native")]
pub use engine::PureOcrBackend;

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::record::BoundingBox;

/// Token details kept per page, for storage economy.
const MAX_STORED_TOKENS: usize = 20;

/// Lines shorter than this that mention an invoice keyword are uppercased
/// in the formatted text, to aid downstream field matching.
const SHORT_LINE_CHARS: usize = 50;

const EMPHASIS_KEYWORDS: [&str; 4] = ["invoice", "total", "date", "amount"];

/// One recognized token with its confidence and position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDetail {
    /// Recognized text.
    pub text: String,

    /// Recognition confidence (0-100).
    pub confidence: f32,

    /// Pixel bounding box on the page.
    pub position: BoundingBox,
}

/// Result of text recognition on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPageResult {
    /// 1-based page number matching the rasterizer's page order.
    pub page: u32,

    /// Formatted text (whitespace-collapsed, keyword lines uppercased).
    pub text: String,

    /// Raw recognized text, tokens joined in reading order.
    pub raw_text: String,

    /// Mean token confidence (0-100, rounded to one decimal; 0 if no tokens).
    pub confidence: f32,

    /// Word count over the raw text.
    pub word_count: usize,

    /// Non-empty line count over the raw text.
    pub line_count: usize,

    /// Up to 20 highest-confidence token details.
    pub tokens: Vec<TokenDetail>,
}

impl OcrPageResult {
    /// Degraded result for a page that could not be recognized: empty text,
    /// confidence 0. The run continues with this instead of aborting.
    pub fn degraded(page: u32) -> Self {
        Self {
            page,
            text: String::new(),
            raw_text: String::new(),
            confidence: 0.0,
            word_count: 0,
            line_count: 0,
            tokens: Vec::new(),
        }
    }
}

/// Recognize one page image, degrading to an empty result on failure.
pub fn read_page(backend: &dyn OcrBackend, image_path: &Path, page: u32) -> OcrPageResult {
    let image = match image::open(image_path) {
        Ok(image) => image,
        Err(e) => {
            warn!(page, path = %image_path.display(), error = %e, "failed to open page image for OCR");
            return OcrPageResult::degraded(page);
        }
    };

    match backend.recognize(&image) {
        Ok(tokens) => build_page_result(page, tokens),
        Err(e) => {
            warn!(page, error = %e, "text recognition failed");
            OcrPageResult::degraded(page)
        }
    }
}

/// Assemble the page result from recognized tokens (assumed reading order).
pub fn build_page_result(page: u32, tokens: Vec<TokenDetail>) -> OcrPageResult {
    let raw_text = tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let confidence = if tokens.is_empty() {
        0.0
    } else {
        let mean = tokens.iter().map(|t| t.confidence).sum::<f32>() / tokens.len() as f32;
        (mean * 10.0).round() / 10.0
    };

    let word_count = raw_text.split_whitespace().count();
    let line_count = raw_text.lines().filter(|l| !l.trim().is_empty()).count();
    let text = format_text(&raw_text);

    let mut tokens = tokens;
    tokens.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    tokens.truncate(MAX_STORED_TOKENS);

    OcrPageResult {
        page,
        text,
        raw_text,
        confidence,
        word_count,
        line_count,
        tokens,
    }
}

/// Produce the formatted text variant:
/// - collapse internal whitespace per line;
/// - uppercase short lines mentioning an invoice keyword;
/// - collapse runs of 3+ blank lines to 2.
pub fn format_text(raw: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut blanks = 0usize;

    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blanks += 1;
            if blanks <= 2 {
                out.push(collapsed);
            }
            continue;
        }
        blanks = 0;

        let lower = collapsed.to_lowercase();
        if collapsed.len() < SHORT_LINE_CHARS
            && EMPHASIS_KEYWORDS.iter().any(|k| lower.contains(k))
        {
            out.push(collapsed.to_uppercase());
        } else {
            out.push(collapsed);
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(text: &str, confidence: f32) -> TokenDetail {
        TokenDetail {
            text: text.to_string(),
            confidence,
            position: BoundingBox::default(),
        }
    }

    #[test]
    fn formats_keyword_lines_uppercase() {
        let raw = "Invoice   No:  INV-001\nSome ordinary line of body text\nTotal  KSh 500.00";
        let formatted = format_text(raw);
        assert_eq!(
            formatted,
            "INVOICE NO: INV-001\nSome ordinary line of body text\nTOTAL KSH 500.00"
        );
    }

    #[test]
    fn long_keyword_lines_keep_their_case() {
        let long = "this line mentions an invoice but runs well past fifty characters total";
        assert_eq!(format_text(long), long);
    }

    #[test]
    fn collapses_blank_line_runs() {
        let raw = "a\n\n\n\n\nb";
        assert_eq!(format_text(raw), "a\n\n\nb");

        // Two blank lines are left alone.
        assert_eq!(format_text("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn confidence_is_mean_of_tokens_rounded() {
        let result = build_page_result(1, vec![token("a", 90.0), token("b", 80.5)]);
        assert_eq!(result.confidence, 85.3);
        assert_eq!(result.page, 1);
    }

    #[test]
    fn no_tokens_means_zero_confidence() {
        let result = build_page_result(2, Vec::new());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.raw_text, "");
        assert_eq!(result.word_count, 0);
    }

    #[test]
    fn keeps_only_top_confidence_tokens() {
        let tokens: Vec<TokenDetail> = (0..30).map(|i| token("w", i as f32)).collect();
        let result = build_page_result(1, tokens);

        assert_eq!(result.tokens.len(), MAX_STORED_TOKENS);
        assert_eq!(result.tokens[0].confidence, 29.0);
        // Raw text still covers every token.
        assert_eq!(result.word_count, 30);
    }

    #[test]
    fn degraded_result_is_empty() {
        let result = OcrPageResult::degraded(3);
        assert_eq!(result.page, 3);
        assert_eq!(result.confidence, 0.0);
        assert!(result.text.is_empty());
        assert!(result.tokens.is_empty());
    }

    #[test]
    fn read_page_degrades_on_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_1.png");
        std::fs::write(&path, b"not an image").unwrap();

        let backend = StaticOcrBackend::new(&[("INVOICE", 90.0)]);
        let result = read_page(&backend, &path, 1);

        assert_eq!(result.confidence, 0.0);
        assert!(result.text.is_empty());
    }

    #[test]
    fn read_page_degrades_on_backend_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_1.png");
        std::fs::write(&path, crate::raster::minimal_png()).unwrap();

        let result = read_page(&FailingOcrBackend, &path, 1);
        assert_eq!(result.confidence, 0.0);
        assert!(result.raw_text.is_empty());
    }
}
