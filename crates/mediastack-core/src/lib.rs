//! Core types, configuration, and shared state for MediaStack.
//!
//! This crate provides the building blocks shared by the upload service
//! crates and the server binary: the validated [`UploadId`] identifier, the
//! [`IdPattern`] it is checked against, the process-wide
//! [`MediaStackConfig`], and [`KeyedLocks`], a registry of per-key async
//! mutexes used to serialize work on one upload session.

mod config;
mod error;
mod locks;
mod types;

pub use config::MediaStackConfig;
pub use error::{MediaStackError, MediaStackResult};
pub use locks::{KeyedGuard, KeyedLocks};
pub use types::{IdPattern, UploadId};
