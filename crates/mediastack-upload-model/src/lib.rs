//! Wire model for the MediaStack chunked upload protocol.
//!
//! Decoded request inputs, JSON-serializable outputs, the operation enum used
//! for routing and logging, and the [`UploadError`] carried back to clients.

pub mod error;
pub mod input;
pub mod operations;
pub mod output;

pub use error::{UploadError, UploadErrorCode};
pub use operations::UploadOperation;
