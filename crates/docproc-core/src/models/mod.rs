//! Data models for the document processing pipeline.

pub mod fields;
pub mod record;

pub use fields::{InvoiceFields, LineItem, NOT_FOUND};
pub use record::{
    BoundingBox, DocumentRecord, ProcessingResult, ProcessingStatus, ProcessingStep,
};
