//! Chunked upload assembler for MediaStack.
//!
//! Large files arrive as numbered chunks spread over many requests. Each
//! chunk is written to a per-upload scratch directory; a finalize request
//! concatenates the chunks in index order, hands the result to a media
//! store and purges the scratch state. Small files may skip chunking and be
//! sent whole through the single-shot path.
//!
//! # Architecture
//!
//! ```text
//! mediastack-upload-http (routing, form decoding, JSON)
//!        |
//!        v
//!   MediaUploader (validation, session lock, assembly)
//!        |                       |
//!        v                       v
//!   ScratchStore             MediaStore
//!   (chunks, manifest)       (persisted media records)
//! ```

pub mod config;
pub mod error;
pub mod manifest;
pub mod media;
mod ops;
pub mod provider;
pub mod scratch;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::UploadConfig;
pub use error::{UploadServiceError, UploadServiceResult};
pub use ops::session::{MAX_REPORTED_MISSING, SweepReport};
pub use provider::MediaUploader;
