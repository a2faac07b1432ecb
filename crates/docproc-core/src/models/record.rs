//! Document records and pipeline result types.

use serde::{Deserialize, Serialize};

use crate::codes::QrCode;
use crate::links::InvalidLink;
use crate::models::fields::InvoiceFields;
use crate::ocr::OcrPageResult;

/// A document record as handed to the trigger endpoint.
///
/// Created by the caller (the upstream stream adapter normalizes its two
/// inbound schemas onto this shape); read-only within the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document identity.
    pub document_id: String,

    /// Object store bucket holding the artifact.
    pub bucket: String,

    /// Object store key of the artifact.
    pub key: String,

    /// Record status; only "pending" records are accepted.
    pub status: String,

    /// Declared document type selecting the extraction path (pdf|image).
    pub file_type: String,

    /// Upload timestamp, if the caller recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,

    /// Origin of the record (ui upload, batch import, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Caller-supplied metadata, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Terminal and intermediate processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// The pipeline is running.
    Processing,
    /// The run finished with a passing validation score.
    Completed,
    /// The run finished below the score threshold or aborted on error.
    Failed,
}

impl ProcessingStatus {
    /// Stored string form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

/// Pipeline stage stamped into progress snapshots as `current_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStep {
    Downloading,
    Converting,
    ProcessingImage,
    Extracting,
    Validating,
}

impl ProcessingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStep::Downloading => "downloading",
            ProcessingStep::Converting => "converting",
            ProcessingStep::ProcessingImage => "processing_image",
            ProcessingStep::Extracting => "extracting",
            ProcessingStep::Validating => "validating",
        }
    }
}

/// Axis-aligned pixel bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Final outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Identity of the processed document.
    pub document_id: String,

    /// Terminal status derived from the validation score.
    pub status: ProcessingStatus,

    /// All decoded QR codes, in page order.
    pub qr_codes: Vec<QrCode>,

    /// One OCR result per page, in page order.
    pub ocr_results: Vec<OcrPageResult>,

    /// Parsed business fields.
    pub invoice_fields: InvoiceFields,

    /// Code payloads whose fetched content matched the invoice number.
    pub valid_links: Vec<String>,

    /// Code payloads that failed the cross-check, with reasons.
    pub invalid_links: Vec<InvalidLink>,

    /// Validation score, clamped to [0, 100].
    pub validation_score: u32,

    /// Validation errors for flagged checks.
    pub errors: Vec<String>,

    /// UTC completion timestamp (RFC 3339).
    pub processed_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_forms() {
        assert_eq!(ProcessingStatus::Processing.as_str(), "processing");
        assert_eq!(ProcessingStatus::Completed.as_str(), "completed");
        assert_eq!(ProcessingStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn record_deserializes_without_optional_fields() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{"document_id":"doc-1","bucket":"uploads","key":"a.pdf","status":"pending","file_type":"pdf"}"#,
        )
        .unwrap();
        assert_eq!(record.document_id, "doc-1");
        assert!(record.upload_date.is_none());
        assert!(record.source.is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ProcessingStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
