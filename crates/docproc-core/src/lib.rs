//! Core library for scanned-invoice processing.
//!
//! This crate provides:
//! - Rasterization of uploaded artifacts into ordered page images
//! - QR code and OCR extraction per page
//! - Rule-based invoice field parsing
//! - Link cross-checks, validation scoring, and the shared-store gateway
//! - The orchestrating pipeline state machine

pub mod codes;
pub mod error;
pub mod invoice;
pub mod links;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod scoring;
pub mod store;

pub use codes::QrCode;
pub use error::{DocprocError, Result};
pub use invoice::FieldParser;
pub use links::{InvalidLink, LinkVerification, LinkVerifier};
pub use models::{
    DocumentRecord, InvoiceFields, LineItem, ProcessingResult, ProcessingStatus, ProcessingStep,
};
pub use ocr::{OcrBackend, OcrPageResult, TokenDetail};
pub use pipeline::{Processor, ProcessorContext, accept};
pub use raster::{DocumentKind, MockRasterizer, PageRasterizer, PdfiumRasterizer};
pub use scoring::{Validation, evaluate};
pub use store::{
    DocumentStore, FsObjectStore, ItemKey, MemoryStore, ObjectStore, SqliteStore,
};

#[cfg(feature = "native")]
pub use ocr::PureOcrBackend;
