//! Pipeline orchestration.
//!
//! Sequences rasterization → code/text extraction → field parsing → link
//! cross-check → scoring → persistence, writing a progress snapshot before
//! each stage and containing every downstream failure.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::codes;
use crate::error::DocprocError;
use crate::invoice::FieldParser;
use crate::links::LinkVerifier;
use crate::models::record::{
    DocumentRecord, ProcessingResult, ProcessingStatus, ProcessingStep,
};
use crate::ocr::{self, OcrBackend};
use crate::raster::{DocumentKind, PageRasterizer};
use crate::scoring;
use crate::store::{DocumentStore, ItemKey, ObjectStore};

/// Ambient handles for one deployment, constructed explicitly and passed
/// into the processor; no process-wide implicit state.
pub struct ProcessorContext {
    pub objects: Arc<dyn ObjectStore>,
    pub store: Arc<dyn DocumentStore>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub ocr: Arc<dyn OcrBackend>,
    pub verifier: LinkVerifier,
}

/// Validate a record for processing: status must be "pending" and the
/// identity/locator fields non-empty. The trigger endpoint surfaces a
/// violation synchronously as 400, before any background work starts.
pub fn accept(record: &DocumentRecord) -> Result<(), DocprocError> {
    if record.status != "pending" {
        return Err(DocprocError::InvalidInput(format!(
            "document status must be 'pending', got '{}'",
            record.status
        )));
    }
    if record.document_id.is_empty() || record.bucket.is_empty() || record.key.is_empty() {
        return Err(DocprocError::InvalidInput(
            "missing required fields: document_id, bucket, key".to_string(),
        ));
    }
    Ok(())
}

/// Runs the processing state machine for one document at a time.
pub struct Processor {
    ctx: Arc<ProcessorContext>,
}

impl Processor {
    pub fn new(ctx: Arc<ProcessorContext>) -> Self {
        Self { ctx }
    }

    /// Process one record to a terminal status.
    ///
    /// This is the failure boundary: errors from the run are recorded as a
    /// failed status in the store and never propagate to the caller, which
    /// has already received its acknowledgement.
    pub async fn process(&self, record: DocumentRecord) -> ProcessingStatus {
        if let Err(e) = accept(&record) {
            warn!(document_id = %record.document_id, error = %e, "record rejected");
            return ProcessingStatus::Failed;
        }

        match self.run(&record).await {
            Ok(status) => status,
            Err(e) => {
                error!(document_id = %record.document_id, error = %e, "pipeline run failed");
                self.mark_failed(&record.document_id, &e.to_string());
                ProcessingStatus::Failed
            }
        }
    }

    async fn run(&self, record: &DocumentRecord) -> Result<ProcessingStatus, DocprocError> {
        let key = ItemKey::document(&record.document_id);
        info!(document_id = %record.document_id, file_type = %record.file_type, "starting pipeline run");

        self.snapshot(&key, ProcessingStep::Downloading);

        // Working area for the downloaded artifact and rendered pages;
        // dropped (and deleted) on every exit path.
        let work = tempfile::tempdir()?;
        let extension = record.key.rsplit('.').next().unwrap_or("dat").to_lowercase();
        let artifact = work.path().join(format!("document.{extension}"));
        self.ctx
            .objects
            .fetch(&record.bucket, &record.key, &artifact)?;

        let kind = DocumentKind::from_declared(&record.file_type)?;
        let step = match kind {
            DocumentKind::Pdf => ProcessingStep::Converting,
            DocumentKind::Image => ProcessingStep::ProcessingImage,
        };
        self.snapshot(&key, step);
        let pages = self.ctx.rasterizer.rasterize(&artifact, kind, work.path())?;

        self.snapshot(&key, ProcessingStep::Extracting);
        let mut qr_codes = Vec::new();
        let mut ocr_results = Vec::with_capacity(pages.len());
        for (index, page_path) in pages.iter().enumerate() {
            let page_number = (index + 1) as u32;
            qr_codes.extend(codes::read_codes(page_path, page_number));
            ocr_results.push(ocr::read_page(self.ctx.ocr.as_ref(), page_path, page_number));
        }

        let joined = ocr_results
            .iter()
            .map(|result| result.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let fields = FieldParser::new().parse(&joined);

        let payloads: Vec<String> = qr_codes.iter().map(|code| code.data.clone()).collect();
        let links = self
            .ctx
            .verifier
            .verify(&payloads, fields.invoice_number.as_deref())
            .await;

        self.snapshot(&key, ProcessingStep::Validating);
        let validation = scoring::evaluate(&qr_codes, &ocr_results);
        let status = scoring::status_for(validation.score);

        let result = ProcessingResult {
            document_id: record.document_id.clone(),
            status,
            qr_codes,
            ocr_results,
            invoice_fields: fields,
            valid_links: links.valid,
            invalid_links: links.invalid,
            validation_score: validation.score,
            errors: validation.errors,
            processed_date: chrono::Utc::now().to_rfc3339(),
        };

        info!(
            document_id = %record.document_id,
            score = result.validation_score,
            status = status.as_str(),
            "pipeline run finished"
        );
        self.write_final(&key, &result);
        Ok(status)
    }

    /// Best-effort progress snapshot: a write failure is logged and
    /// swallowed so a flaky store cannot abort a run (log-and-continue).
    fn snapshot(&self, key: &ItemKey, step: ProcessingStep) {
        let mut fields = Map::new();
        fields.insert(
            "status".to_string(),
            json!(ProcessingStatus::Processing.as_str()),
        );
        fields.insert("current_step".to_string(), json!(step.as_str()));

        if let Err(e) = self.ctx.store.merge(key, fields) {
            warn!(step = step.as_str(), error = %e, "progress snapshot write failed, continuing");
        }
    }

    fn write_final(&self, key: &ItemKey, result: &ProcessingResult) {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(result.status.as_str()));
        fields.insert("qr_codes".to_string(), to_value(&result.qr_codes));
        fields.insert("ocr_results".to_string(), to_value(&result.ocr_results));
        fields.insert(
            "invoice_fields".to_string(),
            result.invoice_fields.to_stored_value(),
        );
        fields.insert("valid_links".to_string(), to_value(&result.valid_links));
        fields.insert("invalid_links".to_string(), to_value(&result.invalid_links));
        fields.insert(
            "validation_score".to_string(),
            json!(result.validation_score),
        );
        fields.insert("validation_errors".to_string(), json!(result.errors));
        fields.insert("processed_date".to_string(), json!(result.processed_date));

        // A failure here can leave the record stuck at "processing"; there
        // is no retry, so log loudly and move on.
        if let Err(e) = self.ctx.store.merge(key, fields) {
            error!(error = %e, "final result write failed, record may remain in 'processing'");
        }
    }

    fn mark_failed(&self, document_id: &str, message: &str) {
        let key = ItemKey::document(document_id);
        let mut fields = Map::new();
        fields.insert(
            "status".to_string(),
            json!(ProcessingStatus::Failed.as_str()),
        );
        fields.insert("error".to_string(), json!(message));
        fields.insert(
            "processed_date".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        if let Err(e) = self.ctx.store.merge(&key, fields) {
            error!(error = %e, "failed to record failure status");
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::encode_qr_png;
    use crate::error::StoreError;
    use crate::ocr::StaticOcrBackend;
    use crate::raster::{MockRasterizer, minimal_png};
    use crate::store::{FsObjectStore, MemoryStore};

    const INVOICE_TOKENS: [(&str, f32); 3] = [
        ("INVOICE NO: INV-001", 90.0),
        ("Invoice Date: 2024-01-15", 88.0),
        ("Total Amount KSh 500.00", 92.0),
    ];

    struct Fixture {
        processor: Processor,
        store: Arc<MemoryStore>,
        _objects_root: tempfile::TempDir,
    }

    fn fixture(pages: Vec<Vec<u8>>, tokens: &[(&str, f32)]) -> Fixture {
        let objects_root = tempfile::tempdir().unwrap();
        let bucket = objects_root.path().join("uploads");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join("scan.pdf"), b"%PDF-1.4 stub").unwrap();

        let store = Arc::new(MemoryStore::new());
        let ctx = ProcessorContext {
            objects: Arc::new(FsObjectStore::new(objects_root.path())),
            store: store.clone(),
            rasterizer: Arc::new(MockRasterizer::new(pages)),
            ocr: Arc::new(StaticOcrBackend::new(tokens)),
            verifier: LinkVerifier::new(),
        };

        Fixture {
            processor: Processor::new(Arc::new(ctx)),
            store,
            _objects_root: objects_root,
        }
    }

    fn record(status: &str, file_type: &str) -> DocumentRecord {
        DocumentRecord {
            document_id: "doc-1".to_string(),
            bucket: "uploads".to_string(),
            key: "scan.pdf".to_string(),
            status: status.to_string(),
            file_type: file_type.to_string(),
            upload_date: None,
            source: None,
            metadata: None,
        }
    }

    #[test]
    fn accept_rejects_non_pending_status() {
        let err = accept(&record("completed", "pdf")).unwrap_err();
        assert!(matches!(err, DocprocError::InvalidInput(_)));
    }

    #[test]
    fn accept_rejects_missing_fields() {
        let mut incomplete = record("pending", "pdf");
        incomplete.bucket.clear();
        assert!(accept(&incomplete).is_err());
        assert!(accept(&record("pending", "pdf")).is_ok());
    }

    #[tokio::test]
    async fn two_page_pdf_with_code_completes() {
        let fx = fixture(
            vec![encode_qr_png("INV-001"), minimal_png()],
            &INVOICE_TOKENS,
        );

        let status = fx.processor.process(record("pending", "pdf")).await;
        assert_eq!(status, ProcessingStatus::Completed);

        let item = fx.store.get(&ItemKey::document("doc-1")).unwrap();
        assert_eq!(item["status"], "completed");
        assert_eq!(item["invoice_fields"]["invoice_number"], "INV-001");
        assert_eq!(item["validation_score"], 100);
        assert_eq!(item["qr_codes"][0]["page"], 1);
        assert_eq!(item["qr_codes"][0]["data"], "INV-001");
        assert!(item["last_updated"].is_string());
        assert!(item["processed_date"].is_string());

        // Page numbers are 1-based and follow the rasterizer's order.
        assert_eq!(item["ocr_results"][0]["page"], 1);
        assert_eq!(item["ocr_results"][1]["page"], 2);

        // The code payload is not a fetchable URL, so the cross-check
        // partitions it into the invalid side.
        assert_eq!(item["valid_links"].as_array().unwrap().len(), 0);
        assert_eq!(item["invalid_links"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_type_fails_without_rasterizing() {
        let fx = fixture(vec![minimal_png()], &INVOICE_TOKENS);

        let status = fx.processor.process(record("pending", "docx")).await;
        assert_eq!(status, ProcessingStatus::Failed);

        let item = fx.store.get(&ItemKey::document("doc-1")).unwrap();
        assert_eq!(item["status"], "failed");
        assert!(
            item["error"]
                .as_str()
                .unwrap()
                .contains("unsupported file type")
        );
        // The run never reached extraction.
        assert!(item.get("qr_codes").is_none());
    }

    #[tokio::test]
    async fn non_pending_record_is_rejected_without_store_writes() {
        let fx = fixture(vec![minimal_png()], &INVOICE_TOKENS);

        let status = fx.processor.process(record("completed", "pdf")).await;
        assert_eq!(status, ProcessingStatus::Failed);
        assert!(fx.store.get(&ItemKey::document("doc-1")).is_err());
    }

    #[tokio::test]
    async fn unreadable_page_degrades_but_run_terminates() {
        let fx = fixture(
            vec![b"not a png".to_vec(), minimal_png()],
            &INVOICE_TOKENS,
        );

        let status = fx.processor.process(record("pending", "pdf")).await;

        // The run still reaches a terminal status.
        assert_eq!(status, ProcessingStatus::Completed);
        let item = fx.store.get(&ItemKey::document("doc-1")).unwrap();
        assert_eq!(item["status"], "completed");

        // The unreadable page is a degraded result, not an abort. Its empty
        // text is dropped by write sanitization, so only the key vanishes.
        assert_eq!(item["ocr_results"][0]["confidence"], "0");
        assert!(item["ocr_results"][0].get("text").is_none());
        assert_eq!(item["ocr_results"][1]["page"], 2);
    }

    #[tokio::test]
    async fn missing_object_marks_failed() {
        let fx = fixture(vec![minimal_png()], &INVOICE_TOKENS);
        let mut rec = record("pending", "pdf");
        rec.key = "absent.pdf".to_string();

        let status = fx.processor.process(rec).await;
        assert_eq!(status, ProcessingStatus::Failed);

        let item = fx.store.get(&ItemKey::document("doc-1")).unwrap();
        assert_eq!(item["status"], "failed");
        assert!(item["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn image_document_is_a_single_page() {
        let objects_root = tempfile::tempdir().unwrap();
        let bucket = objects_root.path().join("uploads");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join("scan.png"), encode_qr_png("docproc://verify/INV-9")).unwrap();

        let store = Arc::new(MemoryStore::new());
        let ctx = ProcessorContext {
            objects: Arc::new(FsObjectStore::new(objects_root.path())),
            store: store.clone(),
            rasterizer: Arc::new(MockRasterizer::blank(0)),
            ocr: Arc::new(StaticOcrBackend::new(&INVOICE_TOKENS)),
            verifier: LinkVerifier::new(),
        };
        let processor = Processor::new(Arc::new(ctx));

        let mut rec = record("pending", "image");
        rec.key = "scan.png".to_string();
        let status = processor.process(rec).await;
        assert_eq!(status, ProcessingStatus::Completed);

        let item = store.get(&ItemKey::document("doc-1")).unwrap();
        assert_eq!(item["current_step"], "validating");
        assert_eq!(item["ocr_results"].as_array().unwrap().len(), 1);
        assert_eq!(item["qr_codes"][0]["data"], "docproc://verify/INV-9");
    }

    /// Store whose writes always fail: the snapshot policy must keep the
    /// run alive regardless.
    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn merge(
            &self,
            _key: &ItemKey,
            _fields: Map<String, Value>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("store offline".to_string()))
        }

        fn get(&self, _key: &ItemKey) -> Result<Value, StoreError> {
            Err(StoreError::NotFound)
        }
    }

    #[tokio::test]
    async fn snapshot_failures_are_swallowed() {
        let objects_root = tempfile::tempdir().unwrap();
        let bucket = objects_root.path().join("uploads");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join("scan.pdf"), b"%PDF-1.4 stub").unwrap();

        let ctx = ProcessorContext {
            objects: Arc::new(FsObjectStore::new(objects_root.path())),
            store: Arc::new(FailingStore),
            rasterizer: Arc::new(MockRasterizer::blank(1)),
            ocr: Arc::new(StaticOcrBackend::new(&INVOICE_TOKENS)),
            verifier: LinkVerifier::new(),
        };
        let processor = Processor::new(Arc::new(ctx));

        // Every snapshot and the final write fail; the run still reaches a
        // terminal status instead of erroring out.
        let status = processor.process(record("pending", "pdf")).await;
        assert_eq!(status, ProcessingStatus::Completed);
    }
}
