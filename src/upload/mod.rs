//! Upload ingestion: multipart staging, validation, rendition generation and
//! record persistence.

pub mod form;
pub mod naming;
pub mod pipeline;
pub mod renditions;

pub use form::{read_upload_form, StagedFile, UploadForm};
pub use pipeline::ingest;

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only JPG, PNG, or WEBP allowed (got {0:?})")]
    UnsupportedType(String),
    #[error("File exceeds the upload limit of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Malformed upload: {0}")]
    Multipart(String),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type UploadResult<T> = Result<T, UploadError>;
