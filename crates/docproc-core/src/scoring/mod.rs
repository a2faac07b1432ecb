//! Deterministic validation scoring over the extracted data.

use crate::codes::QrCode;
use crate::models::record::ProcessingStatus;
use crate::ocr::OcrPageResult;

/// A run completes when its score reaches this threshold.
pub const COMPLETION_THRESHOLD: u32 = 50;

/// Payloads longer than this earn the per-code bonus.
const LONG_PAYLOAD_CHARS: usize = 10;

/// Document patterns whose presence each earns +5.
const REQUIRED_PATTERNS: [&str; 4] = ["date", "amount", "total", "invoice"];

/// Validation outcome: a clamped score and the flagged checks.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// Score in [0, 100].
    pub score: u32,
    /// Errors for checks that were flagged; empty on a clean pass.
    pub errors: Vec<String>,
}

/// Score the extraction. The rubric is monotonic non-decreasing in each
/// independent positive signal:
/// - any code present: +30, plus +10 per code with a payload over 10 chars;
/// - non-empty recognized text: +20; mean page confidence >70: +20,
///   50< conf ≤70: +10; combined text longer than 50 chars: +10;
/// - each of {date, amount, total, invoice} present in the text: +5.
pub fn evaluate(codes: &[QrCode], pages: &[OcrPageResult]) -> Validation {
    let mut score = 0u32;
    let mut errors = Vec::new();

    if codes.is_empty() {
        errors.push("No QR codes detected".to_string());
    } else {
        score += 30;
        score += 10
            * codes
                .iter()
                .filter(|code| code.data.len() > LONG_PAYLOAD_CHARS)
                .count() as u32;
    }

    let all_text = pages
        .iter()
        .filter(|page| !page.text.is_empty())
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let avg_confidence = if pages.is_empty() {
        0.0
    } else {
        pages.iter().map(|page| page.confidence).sum::<f32>() / pages.len() as f32
    };

    if all_text.trim().is_empty() {
        errors.push("No text extracted".to_string());
    } else {
        score += 20;

        if avg_confidence > 70.0 {
            score += 20;
        } else if avg_confidence > 50.0 {
            score += 10;
        } else {
            errors.push(format!("Low OCR confidence: {avg_confidence:.1}%"));
        }

        if all_text.trim().len() > 50 {
            score += 10;
        }

        let lower = all_text.to_lowercase();
        let found = REQUIRED_PATTERNS
            .iter()
            .filter(|pattern| lower.contains(*pattern))
            .count() as u32;
        if found > 0 {
            score += found * 5;
        } else {
            errors.push("Missing required document patterns".to_string());
        }
    }

    Validation {
        score: score.min(100),
        errors,
    }
}

/// Map the score onto a terminal status.
pub fn status_for(score: u32) -> ProcessingStatus {
    if score >= COMPLETION_THRESHOLD {
        ProcessingStatus::Completed
    } else {
        ProcessingStatus::Failed
    }
}
