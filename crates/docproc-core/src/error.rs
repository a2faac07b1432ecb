//! Error types for the docproc-core library.

use thiserror::Error;

/// Main error type for the document pipeline.
#[derive(Error, Debug)]
pub enum DocprocError {
    /// Rasterization error.
    #[error("raster error: {0}")]
    Raster(#[from] RasterError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Object store error.
    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The submitted record is not valid for processing.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors related to page rasterization.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The declared document type is neither pdf nor image.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// Failed to open/parse the source document.
    #[error("failed to load document: {0}")]
    Load(String),

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,

    /// Rendering a single page failed.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },
}

/// Errors related to text recognition.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors from the shared document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No item exists under the requested key.
    #[error("item not found")]
    NotFound,

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from the object store.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// The requested object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// I/O error while fetching the object.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the docproc-core library.
pub type Result<T> = std::result::Result<T, DocprocError>;
