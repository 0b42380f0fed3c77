//! # Beat Processor Common Library
//!
//! Shared code for the beat processor service:
//! - Common error type
//! - Object storage abstraction and the Google Cloud Storage client
//! - Scoped scratch directories for request-owned files

pub mod error;
pub mod scratch;
pub mod storage;

pub use error::{Error, Result};
pub use storage::{ObjectStore, StorageError, UploadResult};
